//! Reply validation and correlation.
//!
//! Every reassembled frame passes through [`validate`] before the session
//! acts on it. Checks run in a fixed order: frame number, CRC, then
//! type-specific payload checks. A frame that fails while a command is
//! outstanding rejects that command; the same fault on an idle link is
//! merely discarded.

use std::fmt;

use crate::error::EpsError;
use crate::protocol::{
    DataType, FrameHeader, CRC_LEN, HEADER_LEN, TM_OCP_TRIPPED, UNSOLICITED_FRAME_NUMBER,
};
use crate::protocol::frame::check_frame;
use crate::telemetry::{ConfigRecord, HousekeepingSnapshot, OcpRailState};

/// Classification of an incoming frame number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameNumberCheck {
    /// Matches the outstanding request.
    Solicited,
    /// Zero, the device-initiated marker.
    Unsolicited,
    /// Nonzero but matches nothing we sent.
    Unexpected,
}

/// Classify `got` against the frame number of the outstanding request,
/// if any.
pub fn check_frame_number(got: u8, outstanding: Option<u8>) -> FrameNumberCheck {
    if got == UNSOLICITED_FRAME_NUMBER {
        return FrameNumberCheck::Unsolicited;
    }
    match outstanding {
        Some(expected) if got == expected => FrameNumberCheck::Solicited,
        _ => FrameNumberCheck::Unexpected,
    }
}

/// What the session needs to judge a reply.
pub struct ReplyContext<'a> {
    /// The full request frame as sent, header and CRC included.
    pub request: &'a [u8],
    /// Frame number of the outstanding request.
    pub outstanding: Option<u8>,
    /// Reply type the outstanding request calls for.
    pub expected: Option<DataType>,
}

/// Decoded payload of a successfully correlated reply.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ReplyData {
    Housekeeping(HousekeepingSnapshot),
    LoadedConfig(ConfigRecord),
    OcpState(OcpRailState),
    /// Battery acknowledgements carry no payload.
    Battery,
}

/// Why a frame was dropped without affecting any command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscardReason {
    NoCommandOutstanding,
    BadCrc,
    UnsolicitedType { code: u8 },
    UnexpectedFrameNumber { got: u8 },
}

impl fmt::Display for DiscardReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoCommandOutstanding => write!(f, "no command outstanding"),
            Self::BadCrc => write!(f, "CRC check failed"),
            Self::UnsolicitedType { code } => {
                write!(f, "unsolicited frame with type code {}", code)
            }
            Self::UnexpectedFrameNumber { got } => {
                write!(f, "frame number {} matches no outstanding command", got)
            }
        }
    }
}

/// Verdict on one reassembled frame.
#[derive(Debug)]
pub enum ReplyOutcome {
    /// The outstanding command's reply, fully checked and decoded.
    Complete(ReplyData),
    /// Device-initiated over-current trip report.
    Tripped(OcpRailState),
    /// Dropped without touching command state.
    Discarded(DiscardReason),
    /// The outstanding command fails with this error.
    Rejected(EpsError),
}

fn request_payload(request: &[u8]) -> &[u8] {
    if request.len() < HEADER_LEN + CRC_LEN {
        return &[];
    }
    &request[HEADER_LEN..request.len() - CRC_LEN]
}

/// Judge one complete frame against the outstanding request.
pub fn validate(frame: &[u8], ctx: &ReplyContext) -> ReplyOutcome {
    let header = match FrameHeader::from_bytes(frame) {
        Ok(header) => header,
        Err(e) => return ReplyOutcome::Rejected(EpsError::Header(e)),
    };

    let number_check = check_frame_number(header.frame_number, ctx.outstanding);
    if number_check == FrameNumberCheck::Unexpected {
        return match ctx.outstanding {
            Some(expected) => ReplyOutcome::Rejected(EpsError::UnexpectedFrameNumber {
                got: header.frame_number,
                expected,
            }),
            None => ReplyOutcome::Discarded(DiscardReason::UnexpectedFrameNumber {
                got: header.frame_number,
            }),
        };
    }

    // A frame that fails its CRC cannot be trusted in any field, the
    // frame number included. While a command is outstanding the corrupt
    // frame may have been its reply, so the command fails.
    if !check_frame(frame) {
        return if ctx.expected.is_some() {
            ReplyOutcome::Rejected(EpsError::ReplyCrcInvalid)
        } else {
            ReplyOutcome::Discarded(DiscardReason::BadCrc)
        };
    }

    let payload = &frame[HEADER_LEN..frame.len() - CRC_LEN];

    if number_check == FrameNumberCheck::Unsolicited {
        return if header.data_type == TM_OCP_TRIPPED && payload.len() == 1 {
            ReplyOutcome::Tripped(OcpRailState::from_byte(payload[0]))
        } else {
            ReplyOutcome::Discarded(DiscardReason::UnsolicitedType {
                code: header.data_type,
            })
        };
    }

    let Some(expected) = ctx.expected else {
        return ReplyOutcome::Discarded(DiscardReason::NoCommandOutstanding);
    };

    let Some(data_type) = DataType::from_wire(header.data_type) else {
        return ReplyOutcome::Rejected(EpsError::UnexpectedReplyType {
            got: header.data_type,
            expected,
        });
    };
    if data_type != expected {
        return ReplyOutcome::Rejected(EpsError::UnexpectedReplyType {
            got: header.data_type,
            expected,
        });
    }

    match data_type {
        DataType::HkData => match HousekeepingSnapshot::from_bytes(payload) {
            Ok(hk) => ReplyOutcome::Complete(ReplyData::Housekeeping(hk)),
            Err(source) => ReplyOutcome::Rejected(EpsError::ReplyDecode { data_type, source }),
        },
        DataType::LoadedConfig => {
            if payload != request_payload(ctx.request) {
                return ReplyOutcome::Rejected(EpsError::IncorrectLoadedConfig);
            }
            match ConfigRecord::from_bytes(payload) {
                Ok(config) => ReplyOutcome::Complete(ReplyData::LoadedConfig(config)),
                Err(source) => ReplyOutcome::Rejected(EpsError::ReplyDecode { data_type, source }),
            }
        }
        DataType::OcpState => {
            let requested = request_payload(ctx.request);
            if payload.len() != 1 || payload != requested {
                ReplyOutcome::Rejected(EpsError::IncorrectOcpState {
                    got: payload.first().copied().unwrap_or(0),
                    requested: requested.first().copied().unwrap_or(0),
                })
            } else {
                ReplyOutcome::Complete(ReplyData::OcpState(OcpRailState::from_byte(payload[0])))
            }
        }
        DataType::BattReply => ReplyOutcome::Complete(ReplyData::Battery),
        // Command codes and the trip report never come back as the
        // expected reply.
        DataType::CollectHk
        | DataType::SetConfig
        | DataType::SetOcpState
        | DataType::SendBattCmd
        | DataType::ResetOcp
        | DataType::OcpTripped => ReplyOutcome::Rejected(EpsError::UnexpectedReplyType {
            got: header.data_type,
            expected,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::frame::{append_crc, build_frame, FrameCounter};

    fn reply_frame(frame_number: u8, data_type: DataType, payload: &[u8]) -> Vec<u8> {
        let mut frame = vec![frame_number, data_type.wire_code()];
        frame.extend_from_slice(payload);
        append_crc(&mut frame);
        frame
    }

    fn ocp_request(frame_number: u8, rail_byte: u8) -> Vec<u8> {
        let mut counter = FrameCounter::starting_at(frame_number);
        build_frame(&mut counter, DataType::SetOcpState, &[rail_byte])
    }

    #[test]
    fn test_check_frame_number() {
        assert_eq!(check_frame_number(0, None), FrameNumberCheck::Unsolicited);
        assert_eq!(check_frame_number(0, Some(7)), FrameNumberCheck::Unsolicited);
        assert_eq!(check_frame_number(7, Some(7)), FrameNumberCheck::Solicited);
        assert_eq!(check_frame_number(8, Some(7)), FrameNumberCheck::Unexpected);
        assert_eq!(check_frame_number(7, None), FrameNumberCheck::Unexpected);
    }

    #[test]
    fn test_ocp_state_reply_matches_request() {
        let request = ocp_request(3, 0x15);
        let ctx = ReplyContext {
            request: &request,
            outstanding: Some(3),
            expected: Some(DataType::OcpState),
        };
        let reply = reply_frame(3, DataType::OcpState, &[0x15]);
        match validate(&reply, &ctx) {
            ReplyOutcome::Complete(ReplyData::OcpState(state)) => {
                assert_eq!(state.to_byte(), 0x15);
                assert!(state.radio_tx);
                assert!(state.eps_mcu);
                assert!(state.gnss_rx);
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[test]
    fn test_ocp_state_mismatch_rejected() {
        let request = ocp_request(3, 0x15);
        let ctx = ReplyContext {
            request: &request,
            outstanding: Some(3),
            expected: Some(DataType::OcpState),
        };
        let reply = reply_frame(3, DataType::OcpState, &[0x00]);
        match validate(&reply, &ctx) {
            ReplyOutcome::Rejected(EpsError::IncorrectOcpState { got, requested }) => {
                assert_eq!(got, 0x00);
                assert_eq!(requested, 0x15);
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[test]
    fn test_unsolicited_trip() {
        let ctx = ReplyContext {
            request: &[],
            outstanding: None,
            expected: None,
        };
        let reply = reply_frame(0, DataType::OcpTripped, &[0x01]);
        match validate(&reply, &ctx) {
            ReplyOutcome::Tripped(rails) => {
                assert!(rails.radio_tx);
                assert!(!rails.obc);
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[test]
    fn test_unsolicited_trip_during_command() {
        let request = ocp_request(5, 0x3F);
        let ctx = ReplyContext {
            request: &request,
            outstanding: Some(5),
            expected: Some(DataType::OcpState),
        };
        let reply = reply_frame(0, DataType::OcpTripped, &[0x02]);
        assert!(matches!(validate(&reply, &ctx), ReplyOutcome::Tripped(_)));
    }

    #[test]
    fn test_trip_code_as_solicited_reply_rejected() {
        let request = ocp_request(3, 0x15);
        let ctx = ReplyContext {
            request: &request,
            outstanding: Some(3),
            expected: Some(DataType::OcpState),
        };
        // Trip reports carry frame number zero. One that answers our
        // frame number is not a valid reply to anything.
        let reply = reply_frame(3, DataType::OcpTripped, &[0x01]);
        match validate(&reply, &ctx) {
            ReplyOutcome::Rejected(EpsError::UnexpectedReplyType { got, expected }) => {
                assert_eq!(got, 133);
                assert_eq!(expected, DataType::OcpState);
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[test]
    fn test_unsolicited_non_trip_discarded() {
        let ctx = ReplyContext {
            request: &[],
            outstanding: None,
            expected: None,
        };
        let reply = reply_frame(0, DataType::OcpState, &[0x3F]);
        assert!(matches!(
            validate(&reply, &ctx),
            ReplyOutcome::Discarded(DiscardReason::UnsolicitedType { code: 131 })
        ));
    }

    #[test]
    fn test_corrupt_crc_fails_outstanding_command() {
        let request = ocp_request(3, 0x15);
        let ctx = ReplyContext {
            request: &request,
            outstanding: Some(3),
            expected: Some(DataType::OcpState),
        };
        let mut reply = reply_frame(3, DataType::OcpState, &[0x15]);
        let last = reply.len() - 1;
        reply[last] ^= 0xFF;
        assert!(matches!(
            validate(&reply, &ctx),
            ReplyOutcome::Rejected(EpsError::ReplyCrcInvalid)
        ));
    }

    #[test]
    fn test_corrupt_crc_discarded_while_idle() {
        let ctx = ReplyContext {
            request: &[],
            outstanding: None,
            expected: None,
        };
        let mut reply = reply_frame(0, DataType::OcpTripped, &[0x01]);
        reply[2] ^= 0x40;
        assert!(matches!(
            validate(&reply, &ctx),
            ReplyOutcome::Discarded(DiscardReason::BadCrc)
        ));
    }

    #[test]
    fn test_wrong_reply_type_rejected() {
        let request = ocp_request(3, 0x15);
        let ctx = ReplyContext {
            request: &request,
            outstanding: Some(3),
            expected: Some(DataType::OcpState),
        };
        let reply = reply_frame(3, DataType::BattReply, &[]);
        match validate(&reply, &ctx) {
            ReplyOutcome::Rejected(EpsError::UnexpectedReplyType { got, expected }) => {
                assert_eq!(got, 132);
                assert_eq!(expected, DataType::OcpState);
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[test]
    fn test_wrong_frame_number_with_command_outstanding() {
        let request = ocp_request(3, 0x15);
        let ctx = ReplyContext {
            request: &request,
            outstanding: Some(3),
            expected: Some(DataType::OcpState),
        };
        let reply = reply_frame(9, DataType::OcpState, &[0x15]);
        match validate(&reply, &ctx) {
            ReplyOutcome::Rejected(EpsError::UnexpectedFrameNumber { got, expected }) => {
                assert_eq!(got, 9);
                assert_eq!(expected, 3);
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[test]
    fn test_wrong_frame_number_while_idle_discarded() {
        let ctx = ReplyContext {
            request: &[],
            outstanding: None,
            expected: None,
        };
        let reply = reply_frame(9, DataType::OcpState, &[0x15]);
        assert!(matches!(
            validate(&reply, &ctx),
            ReplyOutcome::Discarded(DiscardReason::UnexpectedFrameNumber { got: 9 })
        ));
    }

    #[test]
    fn test_loaded_config_echo_accepted() {
        let mut counter = FrameCounter::starting_at(4);
        let request = build_frame(&mut counter, DataType::SetConfig, &[0x09, 0x12, 0x34]);
        let ctx = ReplyContext {
            request: &request,
            outstanding: Some(4),
            expected: Some(DataType::LoadedConfig),
        };
        let reply = reply_frame(4, DataType::LoadedConfig, &[0x09, 0x12, 0x34]);
        match validate(&reply, &ctx) {
            ReplyOutcome::Complete(ReplyData::LoadedConfig(config)) => {
                assert_eq!(config.tobc_timer_length, 0x1234);
                assert!(config.reset_rail_after_ocp.radio_tx);
                assert!(config.reset_rail_after_ocp.obc);
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[test]
    fn test_loaded_config_mismatch_rejected() {
        let mut counter = FrameCounter::starting_at(4);
        let request = build_frame(&mut counter, DataType::SetConfig, &[0x09, 0x12, 0x34]);
        let ctx = ReplyContext {
            request: &request,
            outstanding: Some(4),
            expected: Some(DataType::LoadedConfig),
        };
        let reply = reply_frame(4, DataType::LoadedConfig, &[0x09, 0x12, 0x35]);
        assert!(matches!(
            validate(&reply, &ctx),
            ReplyOutcome::Rejected(EpsError::IncorrectLoadedConfig)
        ));
    }

    #[test]
    fn test_battery_ack_empty_payload() {
        let mut counter = FrameCounter::starting_at(6);
        let request = build_frame(&mut counter, DataType::SendBattCmd, &[5, 1]);
        let ctx = ReplyContext {
            request: &request,
            outstanding: Some(6),
            expected: Some(DataType::BattReply),
        };
        let reply = reply_frame(6, DataType::BattReply, &[]);
        assert!(matches!(
            validate(&reply, &ctx),
            ReplyOutcome::Complete(ReplyData::Battery)
        ));
    }

    #[test]
    fn test_solicited_frame_while_idle_discarded() {
        // Frame number matches nothing, so it never reaches type checks.
        let ctx = ReplyContext {
            request: &[],
            outstanding: None,
            expected: None,
        };
        let reply = reply_frame(2, DataType::HkData, &[0u8; 105]);
        assert!(matches!(
            validate(&reply, &ctx),
            ReplyOutcome::Discarded(DiscardReason::UnexpectedFrameNumber { got: 2 })
        ));
    }
}
