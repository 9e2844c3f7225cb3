//! Byte transports: the trait the session drives, a serial backend, and a
//! scriptable mock for tests.

pub mod mock;
pub mod serial;
pub mod traits;

pub use mock::MockTransport;
pub use serial::SerialTransport;
pub use traits::{EpsTransport, TransportError};
