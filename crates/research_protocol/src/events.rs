use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::error::ProtocolError;

/// Reference to a source page attached to a `sources` record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceRef {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

impl SourceRef {
    /// Title when present and non-blank, otherwise the URL.
    pub fn label(&self) -> &str {
        self.title
            .as_deref()
            .filter(|title| !title.trim().is_empty())
            .unwrap_or(&self.url)
    }
}

/// Backend-to-client record after parsing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InboundEvent {
    Clarify {
        #[serde(default, deserialize_with = "lenient_text")]
        content: String,
    },
    Plan {
        content: Vec<String>,
    },
    PlanUpdated {
        content: Vec<String>,
    },
    Result {
        #[serde(default, deserialize_with = "lenient_text")]
        content: String,
    },
    Error {
        #[serde(default, deserialize_with = "lenient_optional_text")]
        message: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        trace_id: Option<String>,
    },
    SteerAck {
        #[serde(default, deserialize_with = "lenient_text")]
        content: String,
    },
    /// Intermediate reasoning text.
    Cot {
        content: String,
    },
    /// Newline-separated list of sites under research.
    Sites {
        content: String,
    },
    Sources {
        content: Vec<SourceRef>,
    },
    /// Well-formed record whose `type` this client does not know.
    #[serde(skip)]
    Unknown { event_type: String, payload: Value },
}

const KNOWN_EVENT_TYPES: &[&str] = &[
    "clarify",
    "plan",
    "plan_updated",
    "result",
    "error",
    "steer_ack",
    "cot",
    "sites",
    "sources",
];

impl InboundEvent {
    /// Wire discriminator of this record.
    pub fn event_type(&self) -> &str {
        match self {
            Self::Clarify { .. } => "clarify",
            Self::Plan { .. } => "plan",
            Self::PlanUpdated { .. } => "plan_updated",
            Self::Result { .. } => "result",
            Self::Error { .. } => "error",
            Self::SteerAck { .. } => "steer_ack",
            Self::Cot { .. } => "cot",
            Self::Sites { .. } => "sites",
            Self::Sources { .. } => "sources",
            Self::Unknown { event_type, .. } => event_type,
        }
    }
}

/// Flattens any JSON value into display text. Strings pass through, lists
/// become one line per item, and other values keep their JSON form.
fn text_from_value(value: Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(text) => text,
        Value::Array(items) => items
            .into_iter()
            .map(text_from_value)
            .collect::<Vec<_>>()
            .join("\n"),
        other => other.to_string(),
    }
}

// Terminal records must always land so the run can settle, whatever shape
// the backend gives their text.
fn lenient_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(text_from_value)
}

fn lenient_optional_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<Value>::deserialize(deserializer).map(|value| value.map(text_from_value))
}

pub fn is_known_event_type(event_type: &str) -> bool {
    KNOWN_EVENT_TYPES.contains(&event_type)
}

/// Parses one inbound text frame.
///
/// Frames that are not a JSON object with a string `type`, or whose known
/// list-valued `type` (`plan`, `plan_updated`, `sources`) carries fields of
/// the wrong shape, are malformed and return an error. Text fields of
/// `clarify`, `result`, `error` and `steer_ack` accept any JSON value.
/// A well-formed record with an unrecognized `type` is returned as
/// [`InboundEvent::Unknown`] so callers can tell the two cases apart.
pub fn parse_inbound(text: &str) -> Result<InboundEvent, ProtocolError> {
    let value: Value = serde_json::from_str(text).map_err(ProtocolError::NotJson)?;
    let Some(object) = value.as_object() else {
        return Err(ProtocolError::NotAnObject);
    };
    let Some(event_type) = object.get("type").and_then(Value::as_str) else {
        return Err(ProtocolError::MissingType);
    };
    let event_type = event_type.to_string();

    if !is_known_event_type(&event_type) {
        return Ok(InboundEvent::Unknown {
            event_type,
            payload: value,
        });
    }

    serde_json::from_value(value).map_err(|source| ProtocolError::invalid_fields(event_type, source))
}
