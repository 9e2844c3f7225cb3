//! Command and telemetry driver for a spacecraft electrical power system
//! over a point-to-point serial link.
//!
//! The crate is layered:
//!
//! - [`protocol`]: frame geometry, data type codes, CRC
//! - [`telemetry`]: payload serializers (housekeeping, config, OCP, battery)
//! - [`transport`]: the byte-link trait, a serial backend, a test mock
//! - [`state`]: session states and the reply validator
//! - [`session`]: the driver state machine tying it all together
//!
//! # Example
//!
//! ```no_run
//! use std::time::Instant;
//!
//! use eps_core::{EpsSession, OcpRailState, SerialTransport, SessionConfig};
//!
//! let transport = SerialTransport::open("/dev/ttyUSB0", 57600).expect("open port");
//! let mut session = EpsSession::new(transport, SessionConfig::default());
//! session.init().expect("arm receive");
//!
//! session.send_ocp_state(OcpRailState::ALL).expect("issue command");
//! while !session.command_status().is_final() {
//!     session.step(Instant::now()).expect("session fault");
//!     std::thread::sleep(std::time::Duration::from_millis(10));
//! }
//! println!("rails now: {:?}", session.ocp_state());
//! ```

pub mod error;
pub mod events;
pub mod protocol;
pub mod session;
pub mod state;
pub mod telemetry;
pub mod transport;

pub use error::EpsError;
pub use events::{EpsEvent, EpsObserver, NullObserver, TracingObserver};
pub use protocol::DataType;
pub use session::{EpsSession, SessionConfig};
pub use state::{CommandStatus, SessionState};
pub use telemetry::{
    BatteryCommand, BatteryStatus, ConfigRecord, HousekeepingSnapshot, OcpRailState,
};
pub use transport::{EpsTransport, MockTransport, SerialTransport, TransportError};
