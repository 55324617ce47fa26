//! Coordinator CLI entrypoint for the `kafka_coordinator` binary.
use clap::Parser as _;
use eyre::Result;
use kafka_charm_coordinator::cli::Cli;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // Delegate to library entrypoint
    kafka_charm_coordinator::inner_main(Cli::parse()).await
}
