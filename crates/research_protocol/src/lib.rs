//! Wire contract between the steering research client and its backend.
//!
//! One duplex stream per session carries JSON text records tagged by a `type`
//! field. This crate owns the record shapes, inbound frame parsing, and the
//! path-embedded endpoint addressing. It has no transport or UI coupling.

pub mod error;
pub mod events;
pub mod payload;
pub mod session_id;
pub mod url;

pub use error::ProtocolError;
pub use events::{parse_inbound, InboundEvent, SourceRef};
pub use payload::{encode_outbound, OutboundMessage};
pub use session_id::SessionId;
pub use url::{session_endpoint, session_id_from_path, DEFAULT_SERVER_URL};
