//! Command-line interface definitions for the coordinator.
//!
//! This module contains the CLI argument parsing structures and enums
//! used by the `kafka_coordinator` binary.

use std::{env, path::PathBuf};

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::config::InitSystem;

/// Top-level command-line interface definition.
#[derive(Debug, Parser)]
#[command(name = "kafka_coordinator")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = env!("CARGO_PKG_DESCRIPTION"))]
pub struct Cli {
    #[command(flatten)]
    pub runtime: RuntimeArgs,

    /// Log output format.
    #[arg(long, value_enum, default_value_t = LogFormat::Compact, global = true)]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Command,
}

/// Where the coordinator finds its configuration and who it is.
#[derive(Debug, Clone, Args)]
pub struct RuntimeArgs {
    /// Path to the deployment descriptor
    #[arg(long, env = "KAFKA_CHARM_DIST", default_value = "dist.toml", global = true)]
    pub dist: PathBuf,

    /// Path to the runtime options; a missing file means defaults
    #[arg(
        long,
        env = "KAFKA_CHARM_OPTIONS",
        default_value = "options.toml",
        global = true
    )]
    pub options: PathBuf,

    /// Unit name assigned by the orchestration runtime, `<service>/<number>`
    #[arg(long, env = "JUJU_UNIT_NAME", default_value = "kafka/0", global = true)]
    pub unit_name: String,

    /// Override the init system from the deployment descriptor
    #[arg(long, value_enum, global = true)]
    pub init_system: Option<InitSystem>,
}

/// Available subcommands for the coordinator.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the lifecycle handlers once against the current relation state.
    Dispatch,

    /// Dispatch now and again whenever relation data or options change.
    Watch,

    /// Print the configured Zookeeper connection string as `{"output": ...}`.
    GetZookeepers,

    /// Resolve an interface name, CIDR range or wildcard to a local bind address.
    ResolveInterface {
        /// The selector, as it would be set in the `network_interface` option
        selector: String,
    },

    /// Print the unit's lifecycle state and status as JSON.
    Status,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum LogFormat {
    #[default]
    Compact,
    Json,
    Pretty,
}
