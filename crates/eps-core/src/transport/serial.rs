//! Serial port transport.

use std::io::{Read, Write};
use std::sync::Mutex;
use std::time::Duration;

use tracing::{debug, info};

use super::traits::{EpsTransport, TransportError};

/// UART link to the EPS board.
pub struct SerialTransport {
    port: Mutex<Box<dyn serialport::SerialPort>>,
    wanted: Mutex<Option<usize>>,
    path: String,
}

impl SerialTransport {
    /// Open a serial port in 8N1 framing at the given baud rate.
    pub fn open(path: &str, baud_rate: u32) -> Result<Self, TransportError> {
        let port = serialport::new(path, baud_rate)
            .data_bits(serialport::DataBits::Eight)
            .parity(serialport::Parity::None)
            .stop_bits(serialport::StopBits::One)
            .timeout(Duration::from_millis(100))
            .open()
            .map_err(|e| TransportError::OpenFailed(format!("{}: {}", path, e)))?;
        info!(path = %path, baud = baud_rate, "Serial port opened");
        Ok(Self {
            port: Mutex::new(port),
            wanted: Mutex::new(None),
            path: path.to_string(),
        })
    }

    pub fn path(&self) -> &str {
        &self.path
    }
}

impl EpsTransport for SerialTransport {
    fn start_send(&self, data: &[u8]) -> Result<(), TransportError> {
        let mut port = self.port.lock().unwrap();
        port.write_all(data)
            .map_err(|e| TransportError::WriteFailed(e.to_string()))?;
        port.flush()
            .map_err(|e| TransportError::WriteFailed(e.to_string()))?;
        debug!(len = data.len(), "Sent frame bytes");
        Ok(())
    }

    fn start_receive(&self, len: usize) -> Result<(), TransportError> {
        let mut wanted = self.wanted.lock().unwrap();
        if wanted.is_some() {
            return Err(TransportError::ReceiveBusy);
        }
        *wanted = Some(len);
        Ok(())
    }

    fn poll_receive(&self) -> Result<Option<Vec<u8>>, TransportError> {
        let mut wanted = self.wanted.lock().unwrap();
        let Some(len) = *wanted else {
            return Err(TransportError::ReceiveNotArmed);
        };
        let mut port = self.port.lock().unwrap();
        let available = port
            .bytes_to_read()
            .map_err(|e| TransportError::ReadFailed(e.to_string()))? as usize;
        if available < len {
            return Ok(None);
        }
        let mut buffer = vec![0u8; len];
        port.read_exact(&mut buffer)
            .map_err(|e| TransportError::ReadFailed(e.to_string()))?;
        *wanted = None;
        debug!(len = len, "Received frame bytes");
        Ok(Some(buffer))
    }
}
