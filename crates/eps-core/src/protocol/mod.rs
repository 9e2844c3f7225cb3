//! Wire protocol: frame geometry, data type codes, CRC.

pub mod constants;
pub mod data_type;
pub mod frame;

pub use constants::*;
pub use data_type::DataType;
pub use frame::{FrameCounter, FrameError, FrameHeader};
