//! Driver error taxonomy.

use thiserror::Error;

use crate::protocol::{DataType, FrameError};
use crate::state::SessionState;
use crate::telemetry::TelemetryError;
use crate::transport::TransportError;

/// Everything that can go wrong between a command request and its reply.
///
/// Transport faults keep their cause attached, so a logged failure shows
/// both what the driver was doing and what the link reported.
#[derive(Error, Debug)]
pub enum EpsError {
    #[error("driver not initialised")]
    NotInitialised,

    #[error("a command is already in flight (state {state})")]
    NotIdle { state: SessionState },

    #[error("failed to start request send")]
    SendStart(#[source] TransportError),

    #[error("failed to arm receive")]
    ReceiveStart(#[source] TransportError),

    #[error("receive failed")]
    Receive(#[source] TransportError),

    #[error("built request failed its own CRC check")]
    RequestCrcInvalid,

    #[error("reply CRC check failed")]
    ReplyCrcInvalid,

    #[error("unexpected frame number: got {got}, expected {expected}")]
    UnexpectedFrameNumber { got: u8, expected: u8 },

    #[error("unexpected reply type: got code {got}, expected {expected}")]
    UnexpectedReplyType { got: u8, expected: DataType },

    #[error("loaded config does not match the config sent")]
    IncorrectLoadedConfig,

    #[error("incorrect OCP state: got 0x{got:02X}, requested 0x{requested:02X}")]
    IncorrectOcpState { got: u8, requested: u8 },

    #[error("failed to decode {data_type} payload")]
    ReplyDecode {
        data_type: DataType,
        #[source]
        source: TelemetryError,
    },

    #[error("malformed frame header")]
    Header(#[from] FrameError),

    #[error("no reply within {timeout_ms} ms")]
    Timeout { timeout_ms: u64 },
}
