//! Over-current protection rail state.
//!
//! The EPS reports and accepts rail state as a single byte, one bit per
//! switched rail. Bits 6 and 7 are unused by the hardware.

use std::fmt;

use serde::{Deserialize, Serialize};

/// On/off state of the six OCP-protected rails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OcpRailState {
    /// Bit 0: radio transmitter.
    #[serde(default)]
    pub radio_tx: bool,
    /// Bit 1: radio receiver and camera.
    #[serde(default)]
    pub radio_rx_camera: bool,
    /// Bit 2: EPS microcontroller.
    #[serde(default)]
    pub eps_mcu: bool,
    /// Bit 3: onboard computer.
    #[serde(default)]
    pub obc: bool,
    /// Bit 4: GNSS receiver.
    #[serde(default)]
    pub gnss_rx: bool,
    /// Bit 5: GNSS LNA.
    #[serde(default)]
    pub gnss_lna: bool,
}

impl OcpRailState {
    /// All six rails on.
    pub const ALL: Self = Self {
        radio_tx: true,
        radio_rx_camera: true,
        eps_mcu: true,
        obc: true,
        gnss_rx: true,
        gnss_lna: true,
    };

    /// Pack into the wire byte. Bits 6 and 7 are always clear.
    pub fn to_byte(self) -> u8 {
        let mut byte = 0u8;
        if self.radio_tx {
            byte |= 1 << 0;
        }
        if self.radio_rx_camera {
            byte |= 1 << 1;
        }
        if self.eps_mcu {
            byte |= 1 << 2;
        }
        if self.obc {
            byte |= 1 << 3;
        }
        if self.gnss_rx {
            byte |= 1 << 4;
        }
        if self.gnss_lna {
            byte |= 1 << 5;
        }
        byte
    }

    /// Unpack from the wire byte. Bits 6 and 7 are ignored.
    pub fn from_byte(byte: u8) -> Self {
        Self {
            radio_tx: byte & (1 << 0) != 0,
            radio_rx_camera: byte & (1 << 1) != 0,
            eps_mcu: byte & (1 << 2) != 0,
            obc: byte & (1 << 3) != 0,
            gnss_rx: byte & (1 << 4) != 0,
            gnss_lna: byte & (1 << 5) != 0,
        }
    }

    pub fn any_enabled(self) -> bool {
        self.to_byte() != 0
    }
}

impl fmt::Display for OcpRailState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names = Vec::new();
        if self.radio_tx {
            names.push("radio_tx");
        }
        if self.radio_rx_camera {
            names.push("radio_rx_camera");
        }
        if self.eps_mcu {
            names.push("eps_mcu");
        }
        if self.obc {
            names.push("obc");
        }
        if self.gnss_rx {
            names.push("gnss_rx");
        }
        if self.gnss_lna {
            names.push("gnss_lna");
        }
        if names.is_empty() {
            write!(f, "none")
        } else {
            write!(f, "{}", names.join("+"))
        }
    }
}
