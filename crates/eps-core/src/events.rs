//! Session event notifications.
//!
//! The session reports command lifecycle and unsolicited telemetry through
//! an observer. The default [`TracingObserver`] routes everything to the
//! `tracing` log; applications that need to react (refresh a display, page
//! an operator on an OCP trip) plug in their own.

use crate::protocol::DataType;
use crate::state::CommandStatus;
use crate::telemetry::OcpRailState;

#[derive(Debug, Clone)]
pub enum EpsEvent {
    /// A command request was accepted and is on the wire.
    CommandStarted {
        command: DataType,
        frame_number: u8,
    },
    /// The in-flight command reached a final status.
    CommandComplete {
        command: DataType,
        status: CommandStatus,
        error: Option<String>,
    },
    /// A new housekeeping report was stored.
    HousekeepingUpdated,
    /// The EPS reported an over-current trip on its own initiative.
    OcpTripped { rails: OcpRailState },
}

pub trait EpsObserver: Send + Sync {
    fn on_event(&self, event: &EpsEvent);
}

/// Observer that drops every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullObserver;

impl EpsObserver for NullObserver {
    fn on_event(&self, _event: &EpsEvent) {}
}

/// Observer that logs events through `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl EpsObserver for TracingObserver {
    fn on_event(&self, event: &EpsEvent) {
        match event {
            EpsEvent::CommandStarted {
                command,
                frame_number,
            } => {
                tracing::debug!(command = %command, frame_number = frame_number, "Command started");
            }
            EpsEvent::CommandComplete {
                command,
                status,
                error,
            } => match error {
                Some(error) => {
                    tracing::warn!(command = %command, status = %status, error = %error, "Command complete");
                }
                None => {
                    tracing::info!(command = %command, status = %status, "Command complete");
                }
            },
            EpsEvent::HousekeepingUpdated => {
                tracing::debug!("Housekeeping updated");
            }
            EpsEvent::OcpTripped { rails } => {
                tracing::warn!(rails = %rails, "OCP trip reported");
            }
        }
    }
}
