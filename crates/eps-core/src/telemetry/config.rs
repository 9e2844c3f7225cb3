//! EPS configuration record.

use std::io::Cursor;

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use serde::{Deserialize, Serialize};

use super::ocp::OcpRailState;
use super::TelemetryError;

/// Configuration uploaded with a config command and echoed back verbatim
/// in the loaded-config report.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigRecord {
    /// Rails the EPS re-enables on its own after an OCP trip.
    #[serde(default)]
    pub reset_rail_after_ocp: OcpRailState,
    /// Watchdog interval in seconds. The EPS reboots the OBC rail if no
    /// command arrives within this window.
    #[serde(default)]
    pub tobc_timer_length: u16,
}

impl ConfigRecord {
    /// Serialized length on the wire.
    pub const SIZE: usize = 3;

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buffer = Vec::with_capacity(Self::SIZE);
        buffer.write_u8(self.reset_rail_after_ocp.to_byte()).unwrap();
        buffer
            .write_u16::<BigEndian>(self.tobc_timer_length)
            .unwrap();
        buffer
    }

    pub fn from_bytes(data: &[u8]) -> Result<Self, TelemetryError> {
        if data.len() < Self::SIZE {
            return Err(TelemetryError::BufferTooSmall {
                expected: Self::SIZE,
                actual: data.len(),
            });
        }
        let mut cursor = Cursor::new(data);
        let rail_byte = cursor.read_u8()?;
        let tobc_timer_length = cursor.read_u16::<BigEndian>()?;
        Ok(Self {
            reset_rail_after_ocp: OcpRailState::from_byte(rail_byte),
            tobc_timer_length,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_layout() {
        let config = ConfigRecord {
            reset_rail_after_ocp: OcpRailState {
                radio_tx: true,
                obc: true,
                ..Default::default()
            },
            tobc_timer_length: 0x1234,
        };
        assert_eq!(config.to_bytes(), vec![0x09, 0x12, 0x34]);
    }

    #[test]
    fn test_round_trip() {
        let config = ConfigRecord {
            reset_rail_after_ocp: OcpRailState::ALL,
            tobc_timer_length: 600,
        };
        let decoded = ConfigRecord::from_bytes(&config.to_bytes()).unwrap();
        assert_eq!(decoded, config);
    }

    #[test]
    fn test_too_small() {
        assert!(ConfigRecord::from_bytes(&[0x09, 0x12]).is_err());
    }
}
