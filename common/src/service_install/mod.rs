//! Service installation and control for the init systems the broker can run under.

pub mod openrc;
pub mod serviceless;
pub mod systemd;

use core::fmt;
use std::process::Command;

/// Prefixes an error with what was being attempted, for the `String` errors these helpers return.
trait ErrorContext<T> {
    fn context(self, what: impl fmt::Display) -> Result<T, String>;
}

impl<T, E: fmt::Display> ErrorContext<T> for Result<T, E> {
    fn context(self, what: impl fmt::Display) -> Result<T, String> {
        self.map_err(|e| format!("{what}: {e}"))
    }
}

/// Returns `true` if the current process is running as superuser (root).
pub fn is_superuser() -> bool {
    nix::unistd::geteuid().is_root()
}

/// Returns `true` if the system uses OpenRC (checks `/run/openrc` or `/etc/init.d`).
pub fn is_openrc() -> bool {
    std::path::Path::new("/run/openrc").exists() || std::path::Path::new("/etc/init.d").exists()
}

/// Runs a service-manager command to completion, turning a non-zero exit into an error.
///
/// # Errors
///
/// Returns `Err` with the command and its stderr if it can't be spawned or exits unsuccessfully.
pub fn run_checked(command: &mut Command) -> Result<(), String> {
    let display = format!("{command:?}");
    let output = command.output().context(&display)?;
    if output.status.success() {
        Ok(())
    } else {
        Err(format!(
            "{display} failed with {}: {}",
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        ))
    }
}
