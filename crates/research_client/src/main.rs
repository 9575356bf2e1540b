use anyhow::Context;
use clap::Parser;
use research_client::config::{ClientArgs, ClientConfig};
use research_client::logging::init_logging;
use research_client::run_client;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ClientConfig::from_args(ClientArgs::parse());
    init_logging(&config.logging).context("failed to set up logging")?;

    let exit = run_client(config).await?;
    tracing::debug!(?exit, "client exited");
    Ok(())
}
