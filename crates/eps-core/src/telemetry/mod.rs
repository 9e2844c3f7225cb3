//! Payload serializers and deserializers for EPS telemetry and command data.

use thiserror::Error;

pub mod battery;
pub mod config;
pub mod hk;
pub mod ocp;

pub use battery::{BatteryCommand, BatteryStatus};
pub use config::ConfigRecord;
pub use hk::HousekeepingSnapshot;
pub use ocp::OcpRailState;

#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("buffer too small: expected {expected}, got {actual}")]
    BufferTooSmall { expected: usize, actual: usize },

    #[error("payload read failed")]
    Io(#[from] std::io::Error),
}
