use serde::{Deserialize, Serialize};

use crate::error::ProtocolError;

/// Client-to-backend record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutboundMessage {
    StartResearch { query: String },
    ClarifyAnswer { answer: String },
    Steer { instruction: String },
}

impl OutboundMessage {
    pub fn start_research(query: impl Into<String>) -> Self {
        Self::StartResearch {
            query: query.into(),
        }
    }

    pub fn clarify_answer(answer: impl Into<String>) -> Self {
        Self::ClarifyAnswer {
            answer: answer.into(),
        }
    }

    pub fn steer(instruction: impl Into<String>) -> Self {
        Self::Steer {
            instruction: instruction.into(),
        }
    }

    pub fn message_type(&self) -> &'static str {
        match self {
            Self::StartResearch { .. } => "start_research",
            Self::ClarifyAnswer { .. } => "clarify_answer",
            Self::Steer { .. } => "steer",
        }
    }

    pub fn to_json(&self) -> Result<String, ProtocolError> {
        encode_outbound(self)
    }
}

pub fn encode_outbound(message: &OutboundMessage) -> Result<String, ProtocolError> {
    serde_json::to_string(message).map_err(ProtocolError::Serialize)
}
