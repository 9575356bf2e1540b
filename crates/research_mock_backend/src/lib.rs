//! Scripted stand-in for the research backend.
//!
//! Serves the same `/ws/<session_id>` stream as the real service, replying to
//! each client record from a fixed script: a clarification question for a new
//! query, then a plan and a report once it is answered. Steering instructions
//! are acknowledged. No research is performed.

pub mod script;
pub mod server;

pub use script::{normalize_answer, MockConversation, CLARIFY_PREFIX};
pub use server::MockBackend;
