//! systemd unit installation and control.

use std::{
    fs,
    path::{Path, PathBuf},
    process::Command,
};

use super::{ErrorContext as _, run_checked};

/// Writes `<unit_dir>/<name>.service` and reloads the systemd daemon.
///
/// Returns the path of the written unit file.
///
/// # Errors
///
/// Returns `Err` if the unit file can't be written or `systemctl daemon-reload` fails.
pub fn install_service(name: &str, unit_content: &str, unit_dir: &Path) -> Result<PathBuf, String> {
    let service_file_path = unit_dir.join(format!("{name}.service"));

    fs::create_dir_all(unit_dir).context("Failed to create unit directory")?;
    fs::write(&service_file_path, unit_content)
        .context(format_args!("Failed to write {service_file_path:?}"))?;

    run_checked(Command::new("systemctl").arg("daemon-reload"))?;

    Ok(service_file_path)
}

/// Enables the unit so it starts on boot.
///
/// # Errors
///
/// Returns `Err` if `systemctl enable` fails.
pub fn enable(name: &str) -> Result<(), String> {
    run_checked(Command::new("systemctl").arg("enable").arg(format!("{name}.service")))
}

/// Starts the unit and blocks until systemd reports back.
///
/// # Errors
///
/// Returns `Err` if `systemctl start` fails.
pub fn start(name: &str) -> Result<(), String> {
    run_checked(Command::new("systemctl").arg("start").arg(format!("{name}.service")))
}

/// Stops the unit.
///
/// # Errors
///
/// Returns `Err` if `systemctl stop` fails.
pub fn stop(name: &str) -> Result<(), String> {
    run_checked(Command::new("systemctl").arg("stop").arg(format!("{name}.service")))
}
