//! Append-only conversation transcript.

use std::fmt;

/// Where a user step came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserOrigin {
    /// A research query or an answer to a clarification request.
    Query,
    /// A steering instruction sent while a run was in progress.
    Instruction,
}

/// Why an error step was recorded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorCause {
    /// The backend reported the failure.
    Backend { trace_id: Option<String> },
    /// The stream closed abnormally or failed.
    ConnectionLost,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepKind {
    User,
    Clarify,
    Plan,
    Report,
    Error,
    Info,
}

impl StepKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Clarify => "clarify",
            Self::Plan => "plan",
            Self::Report => "report",
            Self::Error => "error",
            Self::Info => "info",
        }
    }
}

impl fmt::Display for StepKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TranscriptStep {
    User { text: String, origin: UserOrigin },
    Clarify { question: String },
    Plan { items: Vec<String> },
    Report { content: String },
    Error { message: String, cause: ErrorCause },
    Info { content: String },
}

impl TranscriptStep {
    pub fn kind(&self) -> StepKind {
        match self {
            Self::User { .. } => StepKind::User,
            Self::Clarify { .. } => StepKind::Clarify,
            Self::Plan { .. } => StepKind::Plan,
            Self::Report { .. } => StepKind::Report,
            Self::Error { .. } => StepKind::Error,
            Self::Info { .. } => StepKind::Info,
        }
    }

    pub fn is_connection_loss(&self) -> bool {
        matches!(
            self,
            Self::Error {
                cause: ErrorCause::ConnectionLost,
                ..
            }
        )
    }

    /// User-visible label for a user step; instructions are marked so they
    /// read differently from plain queries.
    pub fn user_label(&self) -> Option<String> {
        match self {
            Self::User {
                text,
                origin: UserOrigin::Query,
            } => Some(text.clone()),
            Self::User {
                text,
                origin: UserOrigin::Instruction,
            } => Some(format!("(Instruction): {text}")),
            _ => None,
        }
    }
}

/// Insertion-ordered transcript. Steps are only ever appended; there is no API
/// to reorder, remove, or edit a step once recorded.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Transcript {
    steps: Vec<TranscriptStep>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&mut self, step: TranscriptStep) {
        self.steps.push(step);
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn last(&self) -> Option<&TranscriptStep> {
        self.steps.last()
    }

    pub fn get(&self, index: usize) -> Option<&TranscriptStep> {
        self.steps.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, TranscriptStep> {
        self.steps.iter()
    }

    pub fn as_slice(&self) -> &[TranscriptStep] {
        &self.steps
    }

    /// Steps appended at or after `index`; empty when `index` is past the end.
    pub fn since(&self, index: usize) -> &[TranscriptStep] {
        self.steps.get(index..).unwrap_or(&[])
    }

    pub fn has_connection_loss(&self) -> bool {
        self.steps.iter().any(TranscriptStep::is_connection_loss)
    }
}

impl<'a> IntoIterator for &'a Transcript {
    type Item = &'a TranscriptStep;
    type IntoIter = std::slice::Iter<'a, TranscriptStep>;

    fn into_iter(self) -> Self::IntoIter {
        self.steps.iter()
    }
}
