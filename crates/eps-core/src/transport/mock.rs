//! In-memory transport for tests.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use super::traits::{EpsTransport, TransportError};
use crate::protocol::frame::append_crc;
use crate::protocol::DataType;

#[derive(Default)]
struct MockState {
    rx_buffer: VecDeque<u8>,
    wanted: Option<usize>,
    write_log: Vec<Vec<u8>>,
    fail_next_send: bool,
    disconnected: bool,
}

/// Scriptable loopback transport.
///
/// Tests queue reply bytes with [`push_bytes`](MockTransport::push_bytes)
/// or [`push_frame`](MockTransport::push_frame) and inspect what the
/// session sent through [`get_writes`](MockTransport::get_writes). Clones
/// share state, so a test can keep a handle while the session owns another.
#[derive(Clone, Default)]
pub struct MockTransport {
    state: Arc<Mutex<MockState>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue raw bytes for the session to receive.
    pub fn push_bytes(&self, data: &[u8]) {
        let mut state = self.state.lock().unwrap();
        state.rx_buffer.extend(data);
    }

    /// Queue a complete well-formed frame, CRC appended.
    pub fn push_frame(&self, frame_number: u8, data_type: DataType, payload: &[u8]) {
        let mut frame = vec![frame_number, data_type.wire_code()];
        frame.extend_from_slice(payload);
        append_crc(&mut frame);
        self.push_bytes(&frame);
    }

    /// Everything sent so far, one entry per `start_send`.
    pub fn get_writes(&self) -> Vec<Vec<u8>> {
        self.state.lock().unwrap().write_log.clone()
    }

    pub fn clear_writes(&self) {
        self.state.lock().unwrap().write_log.clear();
    }

    /// Make the next `start_send` fail.
    pub fn fail_next_send(&self) {
        self.state.lock().unwrap().fail_next_send = true;
    }

    pub fn disconnect(&self) {
        self.state.lock().unwrap().disconnected = true;
    }

    pub fn reconnect(&self) {
        self.state.lock().unwrap().disconnected = false;
    }

    /// Byte count of the receive currently armed, if any.
    pub fn pending_receive(&self) -> Option<usize> {
        self.state.lock().unwrap().wanted
    }

    /// Bytes queued but not yet consumed by a receive.
    pub fn unread_bytes(&self) -> usize {
        self.state.lock().unwrap().rx_buffer.len()
    }
}

impl EpsTransport for MockTransport {
    fn start_send(&self, data: &[u8]) -> Result<(), TransportError> {
        let mut state = self.state.lock().unwrap();
        if state.disconnected {
            return Err(TransportError::Disconnected);
        }
        if state.fail_next_send {
            state.fail_next_send = false;
            return Err(TransportError::WriteFailed("simulated failure".into()));
        }
        state.write_log.push(data.to_vec());
        Ok(())
    }

    fn start_receive(&self, len: usize) -> Result<(), TransportError> {
        let mut state = self.state.lock().unwrap();
        if state.disconnected {
            return Err(TransportError::Disconnected);
        }
        if state.wanted.is_some() {
            return Err(TransportError::ReceiveBusy);
        }
        state.wanted = Some(len);
        Ok(())
    }

    fn poll_receive(&self) -> Result<Option<Vec<u8>>, TransportError> {
        let mut state = self.state.lock().unwrap();
        if state.disconnected {
            return Err(TransportError::Disconnected);
        }
        let Some(wanted) = state.wanted else {
            return Err(TransportError::ReceiveNotArmed);
        };
        if state.rx_buffer.len() < wanted {
            return Ok(None);
        }
        let data: Vec<u8> = state.rx_buffer.drain(..wanted).collect();
        state.wanted = None;
        Ok(Some(data))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_send_is_logged() {
        let mock = MockTransport::new();
        mock.start_send(&[1, 2, 3]).unwrap();
        mock.start_send(&[4]).unwrap();
        assert_eq!(mock.get_writes(), vec![vec![1, 2, 3], vec![4]]);
    }

    #[test]
    fn test_receive_waits_for_full_count() {
        let mock = MockTransport::new();
        mock.start_receive(4).unwrap();
        mock.push_bytes(&[0xAA, 0xBB]);
        assert!(mock.poll_receive().unwrap().is_none());
        mock.push_bytes(&[0xCC, 0xDD]);
        assert_eq!(
            mock.poll_receive().unwrap(),
            Some(vec![0xAA, 0xBB, 0xCC, 0xDD])
        );
        assert_eq!(mock.unread_bytes(), 0);
    }

    #[test]
    fn test_receive_leaves_excess_queued() {
        let mock = MockTransport::new();
        mock.push_bytes(&[1, 2, 3, 4, 5]);
        mock.start_receive(2).unwrap();
        assert_eq!(mock.poll_receive().unwrap(), Some(vec![1, 2]));
        assert_eq!(mock.unread_bytes(), 3);
    }

    #[test]
    fn test_double_arm_rejected() {
        let mock = MockTransport::new();
        mock.start_receive(2).unwrap();
        assert!(matches!(
            mock.start_receive(2),
            Err(TransportError::ReceiveBusy)
        ));
    }

    #[test]
    fn test_poll_without_arm_rejected() {
        let mock = MockTransport::new();
        assert!(matches!(
            mock.poll_receive(),
            Err(TransportError::ReceiveNotArmed)
        ));
    }

    #[test]
    fn test_push_frame_appends_valid_crc() {
        let mock = MockTransport::new();
        mock.push_frame(1, DataType::OcpState, &[0x3F]);
        mock.start_receive(5).unwrap();
        let frame = mock.poll_receive().unwrap().unwrap();
        assert!(crate::protocol::frame::check_frame(&frame));
        assert_eq!(&frame[..3], &[1, 131, 0x3F]);
    }

    #[test]
    fn test_disconnect() {
        let mock = MockTransport::new();
        mock.disconnect();
        assert!(matches!(
            mock.start_send(&[0]),
            Err(TransportError::Disconnected)
        ));
        mock.reconnect();
        assert!(mock.start_send(&[0]).is_ok());
    }

    #[test]
    fn test_failed_send_not_logged() {
        let mock = MockTransport::new();
        mock.fail_next_send();
        assert!(mock.start_send(&[9]).is_err());
        assert!(mock.get_writes().is_empty());
        mock.start_send(&[9]).unwrap();
        assert_eq!(mock.get_writes().len(), 1);
    }
}
