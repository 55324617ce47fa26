//! Running the broker without an init system, through the scripts shipped in the distribution.

use std::{path::Path, process::Command};

use super::run_checked;

/// Starts the broker in daemon mode via `bin/kafka-server-start.sh`.
///
/// # Errors
///
/// Returns `Err` if the start script fails.
pub fn start(kafka_home: &Path, server_properties: &Path) -> Result<(), String> {
    run_checked(
        Command::new(kafka_home.join("bin").join("kafka-server-start.sh"))
            .arg("-daemon")
            .arg(server_properties),
    )
}

/// Stops the broker via `bin/kafka-server-stop.sh`.
///
/// # Errors
///
/// Returns `Err` if the stop script fails.
pub fn stop(kafka_home: &Path) -> Result<(), String> {
    run_checked(&mut Command::new(
        kafka_home.join("bin").join("kafka-server-stop.sh"),
    ))
}
