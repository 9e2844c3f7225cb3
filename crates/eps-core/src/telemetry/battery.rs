//! Battery pass-through commands and status decoding.
//!
//! The EPS forwards battery commands to the battery board over its own
//! internal bus. The battery acknowledges with an empty reply frame; the
//! outcome shows up later in the battery status word of the next
//! housekeeping report.

/// Command forwarded verbatim to the battery board.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatteryCommand {
    pub command_type: u8,
    pub value: u8,
}

impl BatteryCommand {
    /// Serialized length on the wire.
    pub const SIZE: usize = 2;

    /// Turn off the battery daughterboard heater.
    pub const DISABLE_HEATER: Self = Self {
        command_type: 5,
        value: 1,
    };

    pub fn to_bytes(self) -> [u8; Self::SIZE] {
        [self.command_type, self.value]
    }
}

/// Decoded battery status word, reported as the first housekeeping channel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatteryStatus {
    pub unknown_command_type: bool,
    pub unknown_command_value: bool,
    pub adc_result_not_ready: bool,
    pub oscillator_failure: bool,
    pub watchdog_reset_occurred: bool,
    pub power_on_reset_not_occurred: bool,
    pub brown_out_reset_not_occurred: bool,
    pub i2c_error: bool,
    pub i2c_write_collision: bool,
    pub i2c_overflow: bool,
}

impl BatteryStatus {
    pub fn from_word(word: u16) -> Self {
        Self {
            unknown_command_type: word & (1 << 0) != 0,
            unknown_command_value: word & (1 << 1) != 0,
            adc_result_not_ready: word & (1 << 2) != 0,
            oscillator_failure: word & (1 << 3) != 0,
            watchdog_reset_occurred: word & (1 << 4) != 0,
            power_on_reset_not_occurred: word & (1 << 5) != 0,
            brown_out_reset_not_occurred: word & (1 << 6) != 0,
            i2c_error: word & (1 << 7) != 0,
            i2c_write_collision: word & (1 << 8) != 0,
            i2c_overflow: word & (1 << 9) != 0,
        }
    }

    /// True when no fault bit is set.
    pub fn is_nominal(self) -> bool {
        self == Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disable_heater_bytes() {
        assert_eq!(BatteryCommand::DISABLE_HEATER.to_bytes(), [5, 1]);
    }

    #[test]
    fn test_status_bit_positions() {
        let status = BatteryStatus::from_word(1 << 3);
        assert!(status.oscillator_failure);
        assert!(!status.i2c_error);
        assert!(!status.is_nominal());

        let status = BatteryStatus::from_word((1 << 7) | (1 << 9));
        assert!(status.i2c_error);
        assert!(status.i2c_overflow);
        assert!(!status.i2c_write_collision);
    }

    #[test]
    fn test_nominal_zero_word() {
        assert!(BatteryStatus::from_word(0).is_nominal());
    }
}
