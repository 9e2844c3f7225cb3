//! Transport abstraction.
//!
//! The session drives the link through this trait, so the same state
//! machine runs against real serial hardware or the in-memory mock.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("failed to open port: {0}")]
    OpenFailed(String),

    #[error("send failed: {0}")]
    WriteFailed(String),

    #[error("receive failed: {0}")]
    ReadFailed(String),

    #[error("a receive is already in progress")]
    ReceiveBusy,

    #[error("no receive in progress")]
    ReceiveNotArmed,

    #[error("transport disconnected")]
    Disconnected,

    #[error("transport I/O error")]
    Io(#[from] std::io::Error),
}

/// Byte-level link to the EPS.
///
/// Sends are fire-and-forget. Receives are armed for an exact byte count
/// with [`start_receive`](EpsTransport::start_receive) and collected later
/// with [`poll_receive`](EpsTransport::poll_receive), which returns
/// `Ok(None)` until that many bytes have arrived. Only one receive may be
/// armed at a time.
pub trait EpsTransport: Send + Sync {
    fn start_send(&self, data: &[u8]) -> Result<(), TransportError>;

    fn start_receive(&self, len: usize) -> Result<(), TransportError>;

    fn poll_receive(&self) -> Result<Option<Vec<u8>>, TransportError>;
}
