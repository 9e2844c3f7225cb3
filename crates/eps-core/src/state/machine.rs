//! Session states and command status.

use std::fmt;

/// Where the command state machine currently sits.
///
/// Exactly one state is active at a time. A new command is accepted only
/// in `Idle`; `Request` and `WaitReply` cover a command in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No command in flight.
    Idle,
    /// Request built, waiting to go on the wire.
    Request,
    /// Request sent, waiting for the reply or a timeout.
    WaitReply,
}

impl Default for SessionState {
    fn default() -> Self {
        Self::Idle
    }
}

impl SessionState {
    pub fn is_idle(self) -> bool {
        self == Self::Idle
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "IDLE"),
            Self::Request => write!(f, "REQUEST"),
            Self::WaitReply => write!(f, "WAIT_REPLY"),
        }
    }
}

/// Outcome of the most recent command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandStatus {
    /// No command issued since the status was last cleared.
    None,
    /// Command accepted, no final outcome yet.
    InProgress,
    Success,
    Failure,
}

impl Default for CommandStatus {
    fn default() -> Self {
        Self::None
    }
}

impl CommandStatus {
    pub fn is_final(self) -> bool {
        matches!(self, Self::Success | Self::Failure)
    }
}

impl fmt::Display for CommandStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => write!(f, "NONE"),
            Self::InProgress => write!(f, "IN_PROGRESS"),
            Self::Success => write!(f, "SUCCESS"),
            Self::Failure => write!(f, "FAILURE"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        assert_eq!(SessionState::default(), SessionState::Idle);
        assert_eq!(CommandStatus::default(), CommandStatus::None);
    }

    #[test]
    fn test_final_statuses() {
        assert!(!CommandStatus::None.is_final());
        assert!(!CommandStatus::InProgress.is_final());
        assert!(CommandStatus::Success.is_final());
        assert!(CommandStatus::Failure.is_final());
    }

    #[test]
    fn test_display() {
        assert_eq!(SessionState::WaitReply.to_string(), "WAIT_REPLY");
        assert_eq!(CommandStatus::InProgress.to_string(), "IN_PROGRESS");
    }
}
