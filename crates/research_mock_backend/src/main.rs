use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use research_mock_backend::MockBackend;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "research-mock-backend", about = "Scripted research backend for local runs")]
struct Args {
    /// Address to listen on.
    #[arg(long, default_value = "127.0.0.1:8000")]
    bind: String,

    /// Delay between the records of a research run, in milliseconds.
    #[arg(long, default_value_t = 800)]
    pacing_ms: u64,

    /// Log filter in `tracing` directive syntax.
    #[arg(long, default_value = "info")]
    log_filter: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let filter = EnvFilter::try_new(&args.log_filter)
        .with_context(|| format!("invalid log filter '{}'", args.log_filter))?;
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let backend = MockBackend::bind(&args.bind)
        .await
        .with_context(|| format!("failed to bind {}", args.bind))?
        .with_pacing(Duration::from_millis(args.pacing_ms));
    tracing::info!(url = %backend.base_url()?, "mock backend listening");

    backend.serve().await.context("mock backend stopped")
}
