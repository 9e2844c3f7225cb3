//! Frame data types and the per-type payload length table.
//!
//! The EPS link carries a closed set of frame types: five telecommands and
//! five telemetry replies. Payload lengths are fixed per type, so the length
//! of an incoming frame is known as soon as its header has been read.

use std::fmt;

use super::constants::{
    HK_DATA_LEN, TC_COLLECT_HK_DATA, TC_RESET_OCP, TC_SEND_BATT_CMD, TC_SET_CONFIG,
    TC_SET_OCP_STATE, TM_BATT_REPLY, TM_HK_DATA, TM_LOADED_CONFIG, TM_OCP_STATE, TM_OCP_TRIPPED,
};

/// One of the frame types the EPS link carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataType {
    /// Request a housekeeping snapshot.
    CollectHk,
    /// Load a configuration record.
    SetConfig,
    /// Switch OCP rails on or off.
    SetOcpState,
    /// Forward a command to the battery.
    SendBattCmd,
    /// Power-cycle OCP rails.
    ResetOcp,
    /// Housekeeping snapshot telemetry.
    HkData,
    /// Echo of the loaded configuration.
    LoadedConfig,
    /// Current OCP rail states.
    OcpState,
    /// Unprompted OCP trip notification.
    OcpTripped,
    /// Battery command acknowledgement.
    BattReply,
}

impl DataType {
    /// Every type the link carries, commands first.
    pub const ALL: [DataType; 10] = [
        DataType::CollectHk,
        DataType::SetConfig,
        DataType::SetOcpState,
        DataType::SendBattCmd,
        DataType::ResetOcp,
        DataType::HkData,
        DataType::LoadedConfig,
        DataType::OcpState,
        DataType::OcpTripped,
        DataType::BattReply,
    ];

    /// Wire code for this type.
    pub const fn wire_code(self) -> u8 {
        match self {
            DataType::CollectHk => TC_COLLECT_HK_DATA,
            DataType::SetConfig => TC_SET_CONFIG,
            DataType::SetOcpState => TC_SET_OCP_STATE,
            DataType::SendBattCmd => TC_SEND_BATT_CMD,
            DataType::ResetOcp => TC_RESET_OCP,
            DataType::HkData => TM_HK_DATA,
            DataType::LoadedConfig => TM_LOADED_CONFIG,
            DataType::OcpState => TM_OCP_STATE,
            DataType::OcpTripped => TM_OCP_TRIPPED,
            DataType::BattReply => TM_BATT_REPLY,
        }
    }

    /// Parse a wire code. Codes outside the closed set yield `None`.
    pub fn from_wire(code: u8) -> Option<Self> {
        match code {
            TC_COLLECT_HK_DATA => Some(DataType::CollectHk),
            TC_SET_CONFIG => Some(DataType::SetConfig),
            TC_SET_OCP_STATE => Some(DataType::SetOcpState),
            TC_SEND_BATT_CMD => Some(DataType::SendBattCmd),
            TC_RESET_OCP => Some(DataType::ResetOcp),
            TM_HK_DATA => Some(DataType::HkData),
            TM_LOADED_CONFIG => Some(DataType::LoadedConfig),
            TM_OCP_STATE => Some(DataType::OcpState),
            TM_OCP_TRIPPED => Some(DataType::OcpTripped),
            TM_BATT_REPLY => Some(DataType::BattReply),
            _ => None,
        }
    }

    /// Check if this is a host-to-device command.
    pub const fn is_command(self) -> bool {
        matches!(
            self,
            DataType::CollectHk
                | DataType::SetConfig
                | DataType::SetOcpState
                | DataType::SendBattCmd
                | DataType::ResetOcp
        )
    }

    /// Check if this is a device-to-host telemetry type.
    pub const fn is_telemetry(self) -> bool {
        !self.is_command()
    }

    /// Fixed payload length for this type.
    ///
    /// `BattReply` genuinely carries no payload; the battery status itself
    /// arrives as the first housekeeping channel.
    pub const fn payload_len(self) -> usize {
        match self {
            DataType::CollectHk => 0,
            DataType::SetConfig => 3,
            DataType::SetOcpState => 1,
            DataType::SendBattCmd => 2,
            DataType::ResetOcp => 1,
            DataType::HkData => HK_DATA_LEN,
            DataType::LoadedConfig => 3,
            DataType::OcpState => 1,
            DataType::OcpTripped => 1,
            DataType::BattReply => 0,
        }
    }

    /// Payload length declared by a raw reply code.
    ///
    /// Unknown codes resolve to zero so the receiver drains the header and
    /// CRC it was promised and stays aligned with the byte stream.
    pub fn reply_payload_len(code: u8) -> usize {
        match Self::from_wire(code) {
            Some(data_type) => data_type.payload_len(),
            None => 0,
        }
    }

    /// Telemetry type a command expects as its reply. `None` for telemetry.
    pub const fn expected_reply(self) -> Option<DataType> {
        match self {
            DataType::CollectHk => Some(DataType::HkData),
            DataType::SetConfig => Some(DataType::LoadedConfig),
            DataType::SetOcpState => Some(DataType::OcpState),
            DataType::SendBattCmd => Some(DataType::BattReply),
            DataType::ResetOcp => Some(DataType::OcpState),
            _ => None,
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataType::CollectHk => write!(f, "TC_COLLECT_HK_DATA"),
            DataType::SetConfig => write!(f, "TC_SET_CONFIG"),
            DataType::SetOcpState => write!(f, "TC_SET_OCP_STATE"),
            DataType::SendBattCmd => write!(f, "TC_SEND_BATT_CMD"),
            DataType::ResetOcp => write!(f, "TC_RESET_OCP"),
            DataType::HkData => write!(f, "TM_HK_DATA"),
            DataType::LoadedConfig => write!(f, "TM_LOADED_CONFIG"),
            DataType::OcpState => write!(f, "TM_OCP_STATE"),
            DataType::OcpTripped => write!(f, "TM_OCP_TRIPPED"),
            DataType::BattReply => write!(f, "TM_BATT_REPLY"),
        }
    }
}
