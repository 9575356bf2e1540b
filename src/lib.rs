//! Session transcript reducer for a steerable research assistant.
//!
//! Invariant: the transcript is append-only; every mutation of session state
//! goes through [`Session::handle_event`] (stream side) or
//! [`Session::submit_query`] / [`Session::submit_steer`] (user side).
//!
//! # Public API Overview
//! - [`Session`] owns the transcript, the explicit [`SessionState`], the
//!   connection status, and the two input buffers.
//! - [`SessionHost`] is the outbound seam; the session calls it to send wire
//!   records and to ask observers to re-render.
//! - [`TranscriptStep`] values are what a rendering layer draws.
//!
//! The session is single-threaded and transport-agnostic: any event loop that
//! feeds [`SessionEvent`]s in arrival order can drive it.

pub mod error;
pub mod session;
pub mod transcript;

pub use crate::error::TransportError;
pub use crate::session::{
    ConnectionStatus, DiscardReason, EventOutcome, RejectReason, Session, SessionEvent,
    SessionHost, SessionSnapshot, SessionState, SubmitOutcome, CONNECTION_LOST_MESSAGE,
    DEFAULT_BACKEND_ERROR_MESSAGE,
};
pub use crate::transcript::{ErrorCause, StepKind, Transcript, TranscriptStep, UserOrigin};

/// Wire protocol re-exports.
pub use research_protocol::{InboundEvent, OutboundMessage, SessionId};
