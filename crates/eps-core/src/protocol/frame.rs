//! Frame building and checking.
//!
//! Every frame on the link is header, payload, CRC trailer:
//!
//! ```text
//! [frame_number][data_type][payload ...][crc_hi][crc_lo]
//! ```
//!
//! The CRC-16 covers the header and payload and is transmitted big endian.

use thiserror::Error;

use super::constants::{CRC_LEN, FIRST_FRAME_NUMBER, HEADER_LEN, MAX_FRAME_LEN};
use super::data_type::DataType;

#[derive(Error, Debug)]
pub enum FrameError {
    #[error("buffer too small: expected {expected}, got {actual}")]
    BufferTooSmall { expected: usize, actual: usize },
}

/// Parsed two-byte frame header.
///
/// `data_type` is kept raw here; classification against the closed
/// [`DataType`] set happens during reply validation so unknown codes can
/// still be drained off the link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    pub frame_number: u8,
    pub data_type: u8,
}

impl FrameHeader {
    pub fn to_bytes(self) -> [u8; HEADER_LEN] {
        [self.frame_number, self.data_type]
    }

    pub fn from_bytes(data: &[u8]) -> Result<Self, FrameError> {
        if data.len() < HEADER_LEN {
            return Err(FrameError::BufferTooSmall {
                expected: HEADER_LEN,
                actual: data.len(),
            });
        }
        Ok(Self {
            frame_number: data[0],
            data_type: data[1],
        })
    }
}

/// Source of outgoing frame numbers.
///
/// Numbers run 1..=255 and wrap back to 1. Zero is never assigned; the
/// device uses it to mark unprompted telemetry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameCounter {
    next: u8,
}

impl FrameCounter {
    pub fn new() -> Self {
        Self {
            next: FIRST_FRAME_NUMBER,
        }
    }

    /// Start the sequence at an arbitrary number. Zero snaps to 1.
    pub fn starting_at(next: u8) -> Self {
        Self {
            next: if next == 0 { FIRST_FRAME_NUMBER } else { next },
        }
    }

    /// Number the next request will carry.
    pub fn peek(&self) -> u8 {
        self.next
    }

    fn advance(&mut self) -> u8 {
        let assigned = self.next;
        self.next = if self.next == u8::MAX {
            FIRST_FRAME_NUMBER
        } else {
            self.next + 1
        };
        assigned
    }
}

impl Default for FrameCounter {
    fn default() -> Self {
        Self::new()
    }
}

/// CRC-16/CCITT-FALSE: init 0xFFFF, polynomial 0x1021, no reflection,
/// no final XOR. This is the checksum the EPS firmware computes.
pub fn crc16_ccitt_false(bytes: &[u8]) -> u16 {
    let mut crc: u16 = 0xFFFF;
    for &b in bytes {
        crc ^= (b as u16) << 8;
        for _ in 0..8 {
            if (crc & 0x8000) != 0 {
                crc = (crc << 1) ^ 0x1021;
            } else {
                crc <<= 1;
            }
        }
    }
    crc
}

/// Build a two-byte header, consuming one frame number.
pub fn build_header(counter: &mut FrameCounter, data_type: DataType) -> [u8; HEADER_LEN] {
    [counter.advance(), data_type.wire_code()]
}

/// Compute the CRC over the buffer and append it big endian.
pub fn append_crc(buffer: &mut Vec<u8>) {
    let crc = crc16_ccitt_false(buffer);
    buffer.extend_from_slice(&crc.to_be_bytes());
}

/// Build a complete frame: header, payload, CRC trailer.
pub fn build_frame(counter: &mut FrameCounter, data_type: DataType, payload: &[u8]) -> Vec<u8> {
    let mut frame = Vec::with_capacity(HEADER_LEN + payload.len() + CRC_LEN);
    frame.extend_from_slice(&build_header(counter, data_type));
    frame.extend_from_slice(payload);
    append_crc(&mut frame);
    debug_assert!(frame.len() <= MAX_FRAME_LEN);
    frame
}

/// Recompute the CRC over everything but the trailer and compare.
pub fn check_frame(buffer: &[u8]) -> bool {
    if buffer.len() < HEADER_LEN + CRC_LEN {
        return false;
    }
    let body_len = buffer.len() - CRC_LEN;
    let computed = crc16_ccitt_false(&buffer[..body_len]);
    let received = u16::from_be_bytes([buffer[body_len], buffer[body_len + 1]]);
    computed == received
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::constants::{HK_DATA_LEN, MAX_PAYLOAD_LEN, TC_SET_OCP_STATE};

    #[test]
    fn test_crc_known_vector() {
        // standard CCITT-FALSE check value
        assert_eq!(crc16_ccitt_false(b"123456789"), 0x29B1);
    }

    #[test]
    fn test_crc_round_trip() {
        let mut counter = FrameCounter::new();
        let frame = build_frame(&mut counter, DataType::SetConfig, &[0x09, 0x12, 0x34]);
        assert!(check_frame(&frame));
    }

    #[test]
    fn test_any_bit_flip_fails_check() {
        let mut counter = FrameCounter::new();
        let frame = build_frame(&mut counter, DataType::SetOcpState, &[0x15]);
        for byte in 0..frame.len() {
            for bit in 0..8 {
                let mut corrupted = frame.clone();
                corrupted[byte] ^= 1 << bit;
                assert!(
                    !check_frame(&corrupted),
                    "flip of byte {} bit {} went undetected",
                    byte,
                    bit
                );
            }
        }
    }

    #[test]
    fn test_frame_layout() {
        let mut counter = FrameCounter::new();
        let frame = build_frame(&mut counter, DataType::SetOcpState, &[0x3F]);
        assert_eq!(frame.len(), 5);
        assert_eq!(frame[0], 1);
        assert_eq!(frame[1], TC_SET_OCP_STATE);
        assert_eq!(frame[2], 0x3F);
        let crc = crc16_ccitt_false(&frame[..3]);
        assert_eq!(frame[3], (crc >> 8) as u8);
        assert_eq!(frame[4], (crc & 0xFF) as u8);
    }

    #[test]
    fn test_frame_number_sequence() {
        let mut counter = FrameCounter::new();
        for expected in 1..=10u8 {
            let header = build_header(&mut counter, DataType::CollectHk);
            assert_eq!(header[0], expected);
        }
    }

    #[test]
    fn test_frame_number_wraps_past_255() {
        let mut counter = FrameCounter::starting_at(254);
        let numbers: Vec<u8> = (0..4)
            .map(|_| build_header(&mut counter, DataType::CollectHk)[0])
            .collect();
        assert_eq!(numbers, vec![254, 255, 1, 2]);
        assert!(!numbers.contains(&0));
    }

    #[test]
    fn test_zero_start_snaps_to_one() {
        let mut counter = FrameCounter::starting_at(0);
        assert_eq!(build_header(&mut counter, DataType::CollectHk)[0], 1);
    }

    #[test]
    fn test_header_parse() {
        let header = FrameHeader::from_bytes(&[5, TC_SET_OCP_STATE]).unwrap();
        assert_eq!(header.frame_number, 5);
        assert_eq!(header.data_type, TC_SET_OCP_STATE);
        assert_eq!(header.to_bytes(), [5, TC_SET_OCP_STATE]);

        assert!(FrameHeader::from_bytes(&[5]).is_err());
    }

    #[test]
    fn test_largest_reply_fits_frame_limit() {
        assert!(HK_DATA_LEN <= MAX_PAYLOAD_LEN);
    }
}
