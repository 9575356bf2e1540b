use thiserror::Error;

/// Failure reported by a [`SessionHost`](crate::session::SessionHost) while
/// handing an outbound record to the stream.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("connection is closed")]
    Closed,
}
