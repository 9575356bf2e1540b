use research_protocol::{parse_inbound, InboundEvent, OutboundMessage, SessionId};
use tracing::{debug, warn};

use crate::error::TransportError;
use crate::transcript::{ErrorCause, Transcript, TranscriptStep, UserOrigin};

/// Explicit run state. Gating reads this instead of inspecting the transcript.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    /// The most recent step is a clarification request awaiting an answer.
    AwaitingClarification,
    /// A request is outstanding and no terminal response has arrived.
    Running,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    Connecting,
    Open,
    /// Terminal. The session never reconnects.
    Closed,
}

/// Everything the stream can tell the session, delivered one at a time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    Opened,
    Frame(String),
    TransportError(String),
    Closed {
        abnormal: bool,
        reason: Option<String>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiscardReason {
    Malformed(String),
    /// Well-formed record of a type the session does not know.
    Unrecognized(String),
    /// Known record kept out of the transcript (`cot`, `sites`, `sources`);
    /// handed back so a rendering layer can still show it.
    Untracked(InboundEvent),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventOutcome {
    Appended,
    Unchanged,
    Discarded(DiscardReason),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectReason {
    EmptyInput,
    NotConnected,
    /// Steering requires a run in progress.
    NotBusy,
    SendFailed(TransportError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    Sent(OutboundMessage),
    Rejected(RejectReason),
}

impl SubmitOutcome {
    pub fn is_sent(&self) -> bool {
        matches!(self, Self::Sent(_))
    }
}

/// Point-in-time view of the session for observers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub state: SessionState,
    pub connection: ConnectionStatus,
    pub busy: bool,
    pub transcript_len: usize,
}

/// Outbound seam implemented by whatever owns the stream.
pub trait SessionHost {
    fn send(&mut self, message: OutboundMessage) -> Result<(), TransportError>;
    fn request_render(&mut self);
}

pub const CONNECTION_LOST_MESSAGE: &str = "Connection lost. Restart the client to continue.";
pub const DEFAULT_BACKEND_ERROR_MESSAGE: &str = "An unknown error occurred.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    id: SessionId,
    state: SessionState,
    connection: ConnectionStatus,
    transcript: Transcript,
    pub query_input: String,
    pub steer_input: String,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    /// Starts a session with a freshly generated identifier.
    pub fn new() -> Self {
        Self::with_id(SessionId::generate())
    }

    pub fn with_id(id: SessionId) -> Self {
        Self {
            id,
            state: SessionState::Idle,
            connection: ConnectionStatus::Connecting,
            transcript: Transcript::new(),
            query_input: String::new(),
            steer_input: String::new(),
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn connection(&self) -> ConnectionStatus {
        self.connection
    }

    pub fn busy(&self) -> bool {
        self.state == SessionState::Running
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            state: self.state,
            connection: self.connection,
            busy: self.busy(),
            transcript_len: self.transcript.len(),
        }
    }

    pub fn on_query_input_replace(&mut self, text: impl Into<String>) {
        self.query_input = text.into();
    }

    pub fn on_steer_input_replace(&mut self, text: impl Into<String>) {
        self.steer_input = text.into();
    }

    /// Applies one stream event. This is the only way inbound traffic and
    /// connection lifecycle changes reach the session.
    pub fn handle_event(&mut self, event: SessionEvent) -> EventOutcome {
        match event {
            SessionEvent::Opened => {
                if self.connection == ConnectionStatus::Connecting {
                    self.connection = ConnectionStatus::Open;
                    debug!(session = %self.id, "stream opened");
                }
                EventOutcome::Unchanged
            }
            SessionEvent::Frame(text) => self.on_frame(&text),
            SessionEvent::TransportError(detail) => self.on_connection_lost(&detail),
            SessionEvent::Closed { abnormal: true, reason } => {
                self.on_connection_lost(reason.as_deref().unwrap_or("stream closed abnormally"))
            }
            SessionEvent::Closed {
                abnormal: false,
                reason,
            } => {
                debug!(session = %self.id, reason = ?reason, "stream closed");
                self.connection = ConnectionStatus::Closed;
                if self.state == SessionState::Running {
                    self.state = SessionState::Idle;
                }
                EventOutcome::Unchanged
            }
        }
    }

    /// Sends the query buffer, answering a pending clarification when there is one.
    pub fn submit_query(&mut self, host: &mut dyn SessionHost) -> SubmitOutcome {
        let raw = self.query_input.clone();
        let text = raw.trim();

        if text.is_empty() {
            return SubmitOutcome::Rejected(RejectReason::EmptyInput);
        }
        if self.connection != ConnectionStatus::Open {
            return SubmitOutcome::Rejected(RejectReason::NotConnected);
        }

        let message = if self.state == SessionState::AwaitingClarification {
            OutboundMessage::clarify_answer(raw.clone())
        } else {
            OutboundMessage::start_research(raw.clone())
        };

        if let Err(error) = self.send(host, &message) {
            return SubmitOutcome::Rejected(RejectReason::SendFailed(error));
        }

        self.push_step(TranscriptStep::User {
            text: text.to_string(),
            origin: UserOrigin::Query,
        });
        self.query_input.clear();
        self.state = SessionState::Running;
        host.request_render();

        SubmitOutcome::Sent(message)
    }

    /// Sends the steering buffer. Only accepted while a run is in progress and
    /// never changes the run state.
    pub fn submit_steer(&mut self, host: &mut dyn SessionHost) -> SubmitOutcome {
        let raw = self.steer_input.clone();
        let text = raw.trim();

        if text.is_empty() {
            return SubmitOutcome::Rejected(RejectReason::EmptyInput);
        }
        if self.connection != ConnectionStatus::Open {
            return SubmitOutcome::Rejected(RejectReason::NotConnected);
        }
        if !self.busy() {
            return SubmitOutcome::Rejected(RejectReason::NotBusy);
        }

        let message = OutboundMessage::steer(raw.clone());
        if let Err(error) = self.send(host, &message) {
            return SubmitOutcome::Rejected(RejectReason::SendFailed(error));
        }

        self.push_step(TranscriptStep::User {
            text: text.to_string(),
            origin: UserOrigin::Instruction,
        });
        self.steer_input.clear();
        host.request_render();

        SubmitOutcome::Sent(message)
    }

    fn send(
        &mut self,
        host: &mut dyn SessionHost,
        message: &OutboundMessage,
    ) -> Result<(), TransportError> {
        debug!(session = %self.id, kind = message.message_type(), "outbound record");
        match host.send(message.clone()) {
            Ok(()) => Ok(()),
            Err(error) => {
                self.on_connection_lost(&error.to_string());
                host.request_render();
                Err(error)
            }
        }
    }

    fn on_frame(&mut self, text: &str) -> EventOutcome {
        debug!(session = %self.id, frame = text, "inbound frame");

        match parse_inbound(text) {
            Ok(event) => self.apply_inbound(event),
            Err(error) => {
                warn!(session = %self.id, %error, "discarding malformed inbound frame");
                EventOutcome::Discarded(DiscardReason::Malformed(error.to_string()))
            }
        }
    }

    fn apply_inbound(&mut self, event: InboundEvent) -> EventOutcome {
        match event {
            InboundEvent::Clarify { content } => {
                self.push_step(TranscriptStep::Clarify { question: content });
                self.state = SessionState::AwaitingClarification;
            }
            InboundEvent::Plan { content } | InboundEvent::PlanUpdated { content } => {
                self.push_step(TranscriptStep::Plan { items: content });
            }
            InboundEvent::Result { content } => {
                self.push_step(TranscriptStep::Report { content });
                self.state = SessionState::Idle;
            }
            InboundEvent::Error { message, trace_id } => {
                let message = message
                    .filter(|message| !message.is_empty())
                    .unwrap_or_else(|| DEFAULT_BACKEND_ERROR_MESSAGE.to_string());
                self.push_step(TranscriptStep::Error {
                    message,
                    cause: ErrorCause::Backend { trace_id },
                });
                self.state = SessionState::Idle;
            }
            InboundEvent::SteerAck { content } => {
                self.push_step(TranscriptStep::Info { content });
            }
            InboundEvent::Cot { .. } | InboundEvent::Sites { .. } | InboundEvent::Sources { .. } => {
                debug!(
                    session = %self.id,
                    event_type = event.event_type(),
                    "inbound record not tracked in transcript"
                );
                return EventOutcome::Discarded(DiscardReason::Untracked(event));
            }
            InboundEvent::Unknown { event_type, .. } => {
                warn!(session = %self.id, event_type = %event_type, "ignoring unrecognized inbound record");
                return EventOutcome::Discarded(DiscardReason::Unrecognized(event_type));
            }
        }

        EventOutcome::Appended
    }

    fn on_connection_lost(&mut self, detail: &str) -> EventOutcome {
        self.connection = ConnectionStatus::Closed;
        self.state = SessionState::Idle;

        if self.transcript.has_connection_loss() {
            debug!(session = %self.id, detail, "connection loss already reported");
            return EventOutcome::Unchanged;
        }

        warn!(session = %self.id, detail, "connection lost");
        self.push_step(TranscriptStep::Error {
            message: CONNECTION_LOST_MESSAGE.to_string(),
            cause: ErrorCause::ConnectionLost,
        });
        EventOutcome::Appended
    }

    fn push_step(&mut self, step: TranscriptStep) {
        if self.state == SessionState::AwaitingClarification
            && !matches!(step, TranscriptStep::Clarify { .. })
        {
            self.state = SessionState::Idle;
        }
        self.transcript.push(step);
    }
}
