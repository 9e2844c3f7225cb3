//! Wire protocol constants for the EPS UART link.
//!
//! Values here must match the EPS board firmware exactly.

use std::time::Duration;

// ============================================================================
// Frame Geometry
// ============================================================================

/// Frame header length: frame number byte + data type byte.
pub const HEADER_LEN: usize = 2;

/// CRC trailer length (CRC-16, big endian).
pub const CRC_LEN: usize = 2;

/// Largest frame the link carries, header and CRC included.
pub const MAX_FRAME_LEN: usize = 128;

/// Largest payload a frame can carry.
pub const MAX_PAYLOAD_LEN: usize = MAX_FRAME_LEN - HEADER_LEN - CRC_LEN;

// ============================================================================
// Frame Numbers
// ============================================================================

/// Frame number used by the device for unprompted telemetry.
pub const UNSOLICITED_FRAME_NUMBER: u8 = 0;

/// First frame number assigned to a request, and the wrap target after 255.
pub const FIRST_FRAME_NUMBER: u8 = 1;

// ============================================================================
// Data Type Codes (Host -> Device)
// ============================================================================

/// Request a housekeeping telemetry snapshot.
pub const TC_COLLECT_HK_DATA: u8 = 1;

/// Load a new configuration record into the device.
pub const TC_SET_CONFIG: u8 = 2;

/// Switch the OCP rails to the given on/off states.
pub const TC_SET_OCP_STATE: u8 = 3;

/// Forward a raw command to the battery daughterboard.
pub const TC_SEND_BATT_CMD: u8 = 4;

/// Power-cycle the given OCP rails.
pub const TC_RESET_OCP: u8 = 5;

// ============================================================================
// Data Type Codes (Device -> Host)
// ============================================================================

/// Housekeeping snapshot reply.
pub const TM_HK_DATA: u8 = 129;

/// Echo of the configuration the device loaded.
pub const TM_LOADED_CONFIG: u8 = 130;

/// Report of the current OCP rail states.
pub const TM_OCP_STATE: u8 = 131;

/// Acknowledgement of a forwarded battery command.
pub const TM_BATT_REPLY: u8 = 132;

/// Unprompted notification that one or more OCP rails tripped.
pub const TM_OCP_TRIPPED: u8 = 133;

// ============================================================================
// Housekeeping Layout
// ============================================================================

/// Number of 16-bit sensor channels in a housekeeping snapshot.
pub const HK_CHANNEL_COUNT: usize = 48;

/// Number of single-byte event counters following the channels.
pub const HK_COUNTER_COUNT: usize = 8;

/// Housekeeping payload length: channels, counters, one rail-state byte.
pub const HK_DATA_LEN: usize = HK_CHANNEL_COUNT * 2 + HK_COUNTER_COUNT + 1;

// ============================================================================
// Timing
// ============================================================================

/// Time allowed between sending a request and its correlated reply.
pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(4);
