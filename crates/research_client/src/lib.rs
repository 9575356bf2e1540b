//! Terminal client for a steerable research backend.
//!
//! ## Configuration
//!
//! Every flag has an environment fallback:
//!
//! - `--server-url` / `STEER_RESEARCH_SERVER_URL` (default `ws://localhost:8000`)
//! - `--log-filter` / `STEER_RESEARCH_LOG` (default `warn`, `tracing` filter syntax)
//! - `--log-file` / `STEER_RESEARCH_LOG_FILE` (logs go to stderr when unset)
//! - `--no-color` / `NO_COLOR`
//!
//! ## Input
//!
//! A plain line submits a research query, or answers the pending
//! clarification question. `/steer <instruction>` guides a run in progress.
//! `/help`, `/status`, and `/quit` are local commands.
//!
//! The client opens exactly one stream per start and never reconnects; after
//! the stream is lost, restart the client to begin a new session.

pub mod commands;
pub mod config;
pub mod connection;
pub mod error;
pub mod logging;
pub mod render;
pub mod runtime;

use steer_research::Session;
use tokio::io::BufReader;
use tracing::info;

use crate::config::ClientConfig;
use crate::connection::Connection;
use crate::error::ClientError;
use crate::render::RenderOptions;
use crate::runtime::ExitReason;

/// Runs one interactive session on stdin/stdout until the user quits.
pub async fn run_client(config: ClientConfig) -> Result<ExitReason, ClientError> {
    let session = Session::new();
    let endpoint = research_protocol::session_endpoint(&config.server_url, &session.id())?;
    info!(session = %session.id(), %endpoint, "starting session");

    let connection = Connection::open(endpoint.clone());
    let input = BufReader::new(tokio::io::stdin());
    let output = std::io::stdout();
    let options = RenderOptions {
        color: config.color,
    };

    runtime::run(session, connection, input, output, options, endpoint.as_str()).await
}
