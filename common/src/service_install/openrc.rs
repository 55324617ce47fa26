//! OpenRC init script installation and control.

use std::{
    fs,
    os::unix::fs::PermissionsExt as _,
    path::{Path, PathBuf},
    process::Command,
};

use super::{ErrorContext as _, run_checked};

/// Writes an executable `<init_dir>/<name>` init script.
///
/// Returns the path of the written script.
///
/// # Errors
///
/// Returns `Err` if the script can't be written or made executable.
pub fn install_service(
    name: &str,
    init_script_content: &str,
    init_dir: &Path,
) -> Result<PathBuf, String> {
    let init_script_path = init_dir.join(name);

    fs::create_dir_all(init_dir).context("Failed to create init directory")?;
    fs::write(&init_script_path, init_script_content)
        .context(format_args!("Failed to write {init_script_path:?}"))?;
    fs::set_permissions(&init_script_path, fs::Permissions::from_mode(0o755))
        .context(format_args!("Failed to make {init_script_path:?} executable"))?;

    Ok(init_script_path)
}

/// Adds the service to the default runlevel.
///
/// # Errors
///
/// Returns `Err` if `rc-update` fails.
pub fn enable(name: &str) -> Result<(), String> {
    run_checked(Command::new("rc-update").arg("add").arg(name).arg("default"))
}

/// Starts the service.
///
/// # Errors
///
/// Returns `Err` if `rc-service <name> start` fails.
pub fn start(name: &str) -> Result<(), String> {
    run_checked(Command::new("rc-service").arg(name).arg("start"))
}

/// Stops the service.
///
/// # Errors
///
/// Returns `Err` if `rc-service <name> stop` fails.
pub fn stop(name: &str) -> Result<(), String> {
    run_checked(Command::new("rc-service").arg(name).arg("stop"))
}
