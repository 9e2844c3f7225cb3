//! Command session: the driver's state machine over a transport.
//!
//! An [`EpsSession`] owns the transport and runs the command cycle. Callers
//! issue one command at a time with the `send_*` methods, then call
//! [`step`](EpsSession::step) until [`command_status`](EpsSession::command_status)
//! reaches a final value. Stepping is non-blocking: each call polls the
//! transport for received bytes, feeds complete frames through the reply
//! validator, and advances the state machine until it has nothing left
//! to do.
//!
//! The receive side stays armed at all times. Between commands the session
//! still listens, because the EPS raises unprompted frames on over-current
//! trips.

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::EpsError;
use crate::events::{EpsEvent, EpsObserver, TracingObserver};
use crate::protocol::frame::{build_frame, check_frame, FrameCounter};
use crate::protocol::{DataType, FrameHeader, CRC_LEN, DEFAULT_COMMAND_TIMEOUT, HEADER_LEN};
use crate::state::machine::{CommandStatus, SessionState};
use crate::state::validator::{
    check_frame_number, validate, FrameNumberCheck, ReplyContext, ReplyData, ReplyOutcome,
};
use crate::telemetry::{BatteryCommand, ConfigRecord, HousekeepingSnapshot, OcpRailState};
use crate::transport::{EpsTransport, TransportError};

/// Session settings, loadable from a TOML file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Serial port path. `None` means the caller picks the transport.
    pub port: Option<String>,
    pub baud_rate: u32,
    /// How long to wait for a reply before failing the command.
    pub command_timeout_ms: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            port: None,
            baud_rate: 57600,
            command_timeout_ms: DEFAULT_COMMAND_TIMEOUT.as_millis() as u64,
        }
    }
}

impl SessionConfig {
    pub fn load_from_file(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn save_to_file(&self, path: &str) -> anyhow::Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn command_timeout(&self) -> Duration {
        Duration::from_millis(self.command_timeout_ms)
    }
}

/// Which piece of a reply frame the armed receive is for.
#[derive(Debug, Clone, Copy)]
enum ReplyStage {
    /// Two header bytes.
    Header,
    /// Payload and CRC of the frame this header announced.
    Body(FrameHeader),
    /// Body of a frame we only consume to stay byte-aligned.
    Drain,
}

/// Driver session for one EPS link.
pub struct EpsSession<T: EpsTransport, O: EpsObserver> {
    config: SessionConfig,
    transport: T,
    observer: Arc<O>,
    initialised: bool,
    state: SessionState,
    frames: FrameCounter,
    /// The outstanding request frame, exactly as sent.
    request: Vec<u8>,
    reply_stage: ReplyStage,
    command_status: CommandStatus,
    last_command_type: Option<DataType>,
    last_error: Option<EpsError>,
    consecutive_failures: u32,
    config_synced: bool,
    deadline: Option<Instant>,
    hk: Option<HousekeepingSnapshot>,
    ocp_state: Option<OcpRailState>,
    last_trip: Option<OcpRailState>,
}

impl<T: EpsTransport> EpsSession<T, TracingObserver> {
    /// Session that reports events through `tracing`.
    pub fn new(transport: T, config: SessionConfig) -> Self {
        Self::with_observer(transport, config, Arc::new(TracingObserver))
    }
}

impl<T: EpsTransport, O: EpsObserver> EpsSession<T, O> {
    pub fn with_observer(transport: T, config: SessionConfig, observer: Arc<O>) -> Self {
        Self {
            config,
            transport,
            observer,
            initialised: false,
            state: SessionState::Idle,
            frames: FrameCounter::new(),
            request: Vec::new(),
            reply_stage: ReplyStage::Header,
            command_status: CommandStatus::None,
            last_command_type: None,
            last_error: None,
            consecutive_failures: 0,
            config_synced: false,
            deadline: None,
            hk: None,
            ocp_state: None,
            last_trip: None,
        }
    }

    /// Arm the first header receive. Must be called once before any
    /// command; calling it again is a no-op.
    pub fn init(&mut self) -> Result<(), EpsError> {
        if self.initialised {
            return Ok(());
        }
        self.arm_header()?;
        self.initialised = true;
        info!("EPS driver initialised");
        Ok(())
    }

    // ------------------------------------------------------------------
    // Commands
    // ------------------------------------------------------------------

    /// Request a fresh housekeeping report.
    pub fn send_collect_hk(&mut self) -> Result<(), EpsError> {
        self.begin_command(DataType::CollectHk, &[])
    }

    /// Upload configuration. The EPS echoes it back for verification.
    pub fn send_config(&mut self, config: &ConfigRecord) -> Result<(), EpsError> {
        let payload = config.to_bytes();
        self.begin_command(DataType::SetConfig, &payload)
    }

    /// Switch the OCP rails to exactly this state.
    pub fn send_ocp_state(&mut self, rails: OcpRailState) -> Result<(), EpsError> {
        self.begin_command(DataType::SetOcpState, &[rails.to_byte()])
    }

    /// Forward a command to the battery board.
    pub fn send_battery_command(&mut self, command: BatteryCommand) -> Result<(), EpsError> {
        self.begin_command(DataType::SendBattCmd, &command.to_bytes())
    }

    /// Power-cycle the given rails through their OCP switches.
    pub fn send_reset_ocp(&mut self, rails: OcpRailState) -> Result<(), EpsError> {
        self.begin_command(DataType::ResetOcp, &[rails.to_byte()])
    }

    fn begin_command(&mut self, command: DataType, payload: &[u8]) -> Result<(), EpsError> {
        if !self.initialised {
            return Err(EpsError::NotInitialised);
        }
        if !self.state.is_idle() {
            return Err(EpsError::NotIdle { state: self.state });
        }
        self.request = build_frame(&mut self.frames, command, payload);
        self.command_status = CommandStatus::InProgress;
        self.last_command_type = Some(command);
        self.last_error = None;
        if command == DataType::SetConfig {
            // The board holds whatever it confirms next, not what it
            // confirmed before this upload.
            self.config_synced = false;
        }
        self.goto_state(SessionState::Request);
        self.notify(EpsEvent::CommandStarted {
            command,
            frame_number: self.request[0],
        });
        Ok(())
    }

    // ------------------------------------------------------------------
    // Stepping
    // ------------------------------------------------------------------

    /// Advance the session. Call this regularly; `now` drives the reply
    /// timeout, so tests can feed a simulated clock.
    ///
    /// An `Err` here means the session itself is in trouble (transport
    /// refused to arm a receive, not initialised). Protocol-level command
    /// failures do not return `Err`; they surface through
    /// [`command_status`](Self::command_status) and
    /// [`last_error`](Self::last_error).
    pub fn step(&mut self, now: Instant) -> Result<(), EpsError> {
        if !self.initialised {
            return Err(EpsError::NotInitialised);
        }
        self.poll_reply()?;
        loop {
            let before = self.state;
            match self.state {
                SessionState::Idle => {}
                SessionState::Request => self.start_request(now),
                SessionState::WaitReply => self.check_timeout(now),
            }
            if self.state == before {
                break;
            }
        }
        Ok(())
    }

    fn start_request(&mut self, now: Instant) {
        if !check_frame(&self.request) {
            self.fail_command(EpsError::RequestCrcInvalid);
            return;
        }
        if let Err(e) = self.transport.start_send(&self.request) {
            self.fail_command(EpsError::SendStart(e));
            return;
        }
        self.deadline = Some(now + self.config.command_timeout());
        self.goto_state(SessionState::WaitReply);
    }

    fn check_timeout(&mut self, now: Instant) {
        if let Some(deadline) = self.deadline
            && now >= deadline
        {
            self.fail_command(EpsError::Timeout {
                timeout_ms: self.config.command_timeout_ms,
            });
        }
    }

    // ------------------------------------------------------------------
    // Receive path
    // ------------------------------------------------------------------

    fn poll_reply(&mut self) -> Result<(), EpsError> {
        loop {
            match self.transport.poll_receive() {
                Ok(Some(data)) => match self.reply_stage {
                    ReplyStage::Header => self.on_header(&data)?,
                    ReplyStage::Body(header) => self.on_body(header, &data)?,
                    ReplyStage::Drain => {
                        debug!(len = data.len(), "Drained frame body");
                        self.arm_header()?;
                    }
                },
                Ok(None) => break,
                Err(TransportError::ReceiveNotArmed) => {
                    // A previous arm failed; restore the header receive.
                    self.arm_header()?;
                    break;
                }
                Err(e) => {
                    warn!(error = %e, "Receive poll failed");
                    if self.command_outstanding() {
                        self.fail_command(EpsError::Receive(e));
                    }
                    break;
                }
            }
        }
        Ok(())
    }

    /// Header bytes arrived: classify the frame number and arm the body
    /// receive. The body length comes from the data type table, so even
    /// frames we are about to throw away are consumed in full.
    fn on_header(&mut self, data: &[u8]) -> Result<(), EpsError> {
        let header = FrameHeader::from_bytes(data)?;
        let body_len = DataType::reply_payload_len(header.data_type) + CRC_LEN;
        match check_frame_number(header.frame_number, self.outstanding_frame()) {
            FrameNumberCheck::Solicited | FrameNumberCheck::Unsolicited => {
                self.reply_stage = ReplyStage::Body(header);
            }
            FrameNumberCheck::Unexpected => {
                warn!(
                    frame_number = header.frame_number,
                    data_type = header.data_type,
                    "Unexpected frame number, draining"
                );
                if self.command_outstanding() {
                    self.fail_command(EpsError::UnexpectedFrameNumber {
                        got: header.frame_number,
                        expected: self.request[0],
                    });
                }
                self.reply_stage = ReplyStage::Drain;
            }
        }
        self.transport
            .start_receive(body_len)
            .map_err(EpsError::ReceiveStart)
    }

    /// Body bytes arrived: reassemble the frame, run it through the
    /// validator, act on the outcome, then re-arm the header receive.
    fn on_body(&mut self, header: FrameHeader, data: &[u8]) -> Result<(), EpsError> {
        let mut frame = Vec::with_capacity(HEADER_LEN + data.len());
        frame.extend_from_slice(&header.to_bytes());
        frame.extend_from_slice(data);

        let outcome = {
            let ctx = ReplyContext {
                request: &self.request,
                outstanding: self.outstanding_frame(),
                expected: self.expected_reply(),
            };
            validate(&frame, &ctx)
        };

        match outcome {
            ReplyOutcome::Complete(reply) => self.apply_reply(reply),
            ReplyOutcome::Tripped(rails) => {
                warn!(rails = %rails, "OCP trip reported");
                self.last_trip = Some(rails);
                self.notify(EpsEvent::OcpTripped { rails });
            }
            ReplyOutcome::Discarded(reason) => {
                debug!(reason = %reason, "Frame discarded");
            }
            ReplyOutcome::Rejected(error) => self.fail_command(error),
        }

        self.arm_header()
    }

    fn apply_reply(&mut self, reply: ReplyData) {
        match reply {
            ReplyData::Housekeeping(hk) => {
                self.hk = Some(hk);
                self.notify(EpsEvent::HousekeepingUpdated);
            }
            ReplyData::LoadedConfig(config) => {
                debug!(tobc_timer = config.tobc_timer_length, "Config load confirmed");
            }
            ReplyData::OcpState(state) => {
                self.ocp_state = Some(state);
            }
            ReplyData::Battery => {}
        }
        self.complete_command();
    }

    fn arm_header(&mut self) -> Result<(), EpsError> {
        self.reply_stage = ReplyStage::Header;
        self.transport
            .start_receive(HEADER_LEN)
            .map_err(EpsError::ReceiveStart)
    }

    // ------------------------------------------------------------------
    // Command completion
    // ------------------------------------------------------------------

    fn complete_command(&mut self) {
        self.finalize_command(CommandStatus::Success, None);
    }

    fn fail_command(&mut self, error: EpsError) {
        warn!(error = %error, "Command failed");
        self.finalize_command(CommandStatus::Failure, Some(error));
    }

    fn finalize_command(&mut self, status: CommandStatus, error: Option<EpsError>) {
        if status == CommandStatus::Success {
            self.consecutive_failures = 0;
        } else {
            self.consecutive_failures += 1;
        }
        if self.last_command_type == Some(DataType::SetConfig) {
            self.config_synced = status == CommandStatus::Success;
        }
        let error_text = error.as_ref().map(|e| e.to_string());
        self.last_error = error;
        self.command_status = status;
        self.deadline = None;
        self.goto_state(SessionState::Idle);
        if let Some(command) = self.last_command_type {
            self.notify(EpsEvent::CommandComplete {
                command,
                status,
                error: error_text,
            });
        }
    }

    fn goto_state(&mut self, to: SessionState) {
        info!(from = %self.state, to = %to, "State transition");
        self.state = to;
    }

    fn notify(&self, event: EpsEvent) {
        self.observer.on_event(&event);
    }

    fn command_outstanding(&self) -> bool {
        self.state == SessionState::WaitReply && self.command_status == CommandStatus::InProgress
    }

    fn outstanding_frame(&self) -> Option<u8> {
        if self.command_outstanding() {
            self.request.first().copied()
        } else {
            None
        }
    }

    fn expected_reply(&self) -> Option<DataType> {
        if self.command_outstanding() {
            self.last_command_type.and_then(DataType::expected_reply)
        } else {
            None
        }
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn command_status(&self) -> CommandStatus {
        self.command_status
    }

    /// Reset a final command status to `None`. Ignored while a command
    /// is still in progress.
    pub fn clear_command_status(&mut self) {
        if self.command_status != CommandStatus::InProgress {
            self.command_status = CommandStatus::None;
        }
    }

    pub fn last_command_type(&self) -> Option<DataType> {
        self.last_command_type
    }

    pub fn last_error(&self) -> Option<&EpsError> {
        self.last_error.as_ref()
    }

    /// Most recent housekeeping report, if any arrived this session.
    pub fn housekeeping(&self) -> Option<&HousekeepingSnapshot> {
        self.hk.as_ref()
    }

    /// Rail state from the most recent OCP state report.
    pub fn ocp_state(&self) -> Option<OcpRailState> {
        self.ocp_state
    }

    /// Rails named by the most recent unprompted trip report.
    pub fn last_trip(&self) -> Option<OcpRailState> {
        self.last_trip
    }

    /// True once a config upload has been confirmed by its echo. Cleared
    /// as soon as a new upload starts, until its own echo confirms it.
    pub fn config_synced(&self) -> bool {
        self.config_synced
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }
}
