use research_protocol::{InboundEvent, OutboundMessage, SourceRef};

pub const CLARIFY_PREFIX: &str = "Please choose a research focus:";
pub const DEFAULT_FOCUS: &str = "B";

const FOCUS_OPTIONS: [(&str, &str); 3] = [
    ("A", "Background and history"),
    ("B", "Current state and key players"),
    ("C", "Open problems and outlook"),
];

/// Picks the first standalone `A`/`B`/`C` word, falling back to `B`.
/// Underscores join words, so `A_B` has no standalone option.
pub fn normalize_answer(answer: &str) -> &'static str {
    let upper = answer.trim().to_uppercase();
    upper
        .split(|ch: char| !(ch.is_alphanumeric() || ch == '_'))
        .find_map(|token| {
            FOCUS_OPTIONS
                .iter()
                .find(|(option, _)| *option == token)
                .map(|(option, _)| *option)
        })
        .unwrap_or(DEFAULT_FOCUS)
}

fn focus_label(focus: &str) -> &'static str {
    FOCUS_OPTIONS
        .iter()
        .find(|(option, _)| *option == focus)
        .map_or(FOCUS_OPTIONS[1].1, |(_, label)| *label)
}

/// Per-connection script state.
#[derive(Debug, Clone)]
pub struct MockConversation {
    session_id: String,
    pending_query: Option<String>,
}

impl MockConversation {
    pub fn new(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            pending_query: None,
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn pending_query(&self) -> Option<&str> {
        self.pending_query.as_deref()
    }

    /// Replies to one client text record.
    pub fn respond(&mut self, text: &str) -> Vec<InboundEvent> {
        let message = match serde_json::from_str::<OutboundMessage>(text) {
            Ok(message) => message,
            Err(error) => return vec![self.error(format!("Unrecognized message: {error}"))],
        };

        match message {
            OutboundMessage::StartResearch { query } => {
                let question = clarify_question(query.trim());
                self.pending_query = Some(query);
                vec![InboundEvent::Clarify { content: question }]
            }
            OutboundMessage::ClarifyAnswer { answer } => {
                let Some(query) = self.pending_query.take() else {
                    return vec![self.error("No research question is waiting for an answer.".to_string())];
                };
                let focus = normalize_answer(&answer);
                research_run(query.trim(), focus)
            }
            OutboundMessage::Steer { instruction } => vec![InboundEvent::SteerAck {
                content: format!("Steering instruction received: {}", instruction.trim()),
            }],
        }
    }

    fn error(&self, message: String) -> InboundEvent {
        InboundEvent::Error {
            message: Some(message),
            trace_id: Some(self.session_id.clone()),
        }
    }
}

fn clarify_question(query: &str) -> String {
    let mut question = format!("{CLARIFY_PREFIX} \"{query}\"");
    for (option, label) in FOCUS_OPTIONS {
        question.push_str(&format!("\n{option}) {label}"));
    }
    question
}

fn research_run(query: &str, focus: &str) -> Vec<InboundEvent> {
    let label = focus_label(focus);
    vec![
        InboundEvent::Plan {
            content: vec![
                format!("Search for sources on {query}"),
                format!("Summarize findings about: {label}"),
                "Write the final report".to_string(),
            ],
        },
        InboundEvent::Cot {
            content: format!("Focusing on {label}."),
        },
        InboundEvent::Sources {
            content: vec![SourceRef {
                url: "https://example.org/research".to_string(),
                title: Some(format!("Notes on {query}")),
            }],
        },
        InboundEvent::Result {
            content: format!("# {query}\n\nFocus: {focus}) {label}\n\nNo real research was performed."),
        },
    ]
}
