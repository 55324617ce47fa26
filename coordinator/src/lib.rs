//! Library entry for the `coordinator` crate.
//!
//! Exposes `inner_main` so a workspace-level shim binary can call into the coordinator logic.
//!
//! Drives a Kafka broker through install, configuration against a Zookeeper ensemble,
//! start, reconfiguration and stop.

extern crate alloc;
extern crate core;

pub mod actions;
pub mod cli;
pub mod config;
pub mod kafka;
pub mod lifecycle;
pub mod relations;
pub mod run;
pub mod service;
pub mod state;
pub mod status;
pub mod watch;

#[cfg(test)]
mod test_support;

use std::{env, io, process, sync::Once};

use eyre::Result;
use tracing::{Instrument as _, info};
use tracing_subscriber::{EnvFilter, fmt::time::ChronoLocal};

use cli::{Cli, Command, LogFormat};

static INIT_TRACING: Once = Once::new();

fn init_tracing(log_format: LogFormat) {
    INIT_TRACING.call_once(move || {
        let default_level = if env::var("KAFKA_CHARM_INTEGRATION_TEST").is_ok() {
            "error"
        } else {
            "info"
        };

        // stdout is reserved for command output.
        let builder = tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
            )
            .with_timer(ChronoLocal::rfc_3339())
            .with_writer(io::stderr);

        match log_format {
            LogFormat::Compact => builder.compact().init(),
            LogFormat::Json => builder.json().init(),
            LogFormat::Pretty => builder.pretty().init(),
        }
    });
}

/// The coordinator's main function; can be called from a shim binary.
///
/// Parses CLI and dispatches to the lifecycle handlers, the watch loop or an operator action.
///
/// # Errors
///
/// Returns an error if configuration can't be loaded, a handler fails, or an action finds
/// nothing to report.
pub async fn inner_main(invocation: Cli) -> Result<()> {
    init_tracing(invocation.log_format);
    let args = invocation.runtime;

    match invocation.command {
        Command::Dispatch => {
            let span = tracing::info_span!(
                "kafka.dispatch",
                unit = %args.unit_name,
                pid = ?process::id(),
                version = env!("CARGO_PKG_VERSION")
            );
            run::dispatch_once(&args).instrument(span).await?;
            Ok(())
        }
        Command::Watch => {
            info!(unit = %args.unit_name, "Starting coordinator watch");
            watch::watch(args).await
        }
        Command::GetZookeepers => {
            let output = run::get_zookeepers(&args).await?;
            println!("{}", serde_json::to_string(&output)?);
            Ok(())
        }
        Command::ResolveInterface { selector } => {
            println!("{}", run::resolve_interface(&selector)?);
            Ok(())
        }
        Command::Status => {
            let report = run::status(&args).await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
            Ok(())
        }
    }
}
