//! Command state machine pieces: session states, command status, and the
//! reply validator.

pub mod machine;
pub mod validator;

pub use machine::{CommandStatus, SessionState};
pub use validator::{
    check_frame_number, validate, DiscardReason, FrameNumberCheck, ReplyContext, ReplyData,
    ReplyOutcome,
};
