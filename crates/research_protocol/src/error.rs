use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("inbound frame is not valid JSON: {0}")]
    NotJson(#[source] serde_json::Error),

    #[error("inbound frame must be a JSON object")]
    NotAnObject,

    #[error("inbound frame has no string `type` field")]
    MissingType,

    #[error("inbound `{event_type}` record has invalid fields: {source}")]
    InvalidFields {
        event_type: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to serialize outbound record: {0}")]
    Serialize(#[source] serde_json::Error),

    #[error("invalid server URL: {0}")]
    InvalidBaseUrl(String),
}

impl ProtocolError {
    #[must_use]
    pub fn invalid_fields(event_type: impl Into<String>, source: serde_json::Error) -> Self {
        Self::InvalidFields {
            event_type: event_type.into(),
            source,
        }
    }

    /// Returns whether the frame was structurally unusable, as opposed to an
    /// outbound or addressing failure.
    pub fn is_malformed_frame(&self) -> bool {
        matches!(
            self,
            Self::NotJson(_) | Self::NotAnObject | Self::MissingType | Self::InvalidFields { .. }
        )
    }
}
