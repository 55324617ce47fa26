//! Host-level helpers shared by the Kafka lifecycle coordinator.
//!
//! This crate provides:
//! - Resolution of a network interface selector to a local bind address
//! - Line-oriented editing of `key=value` property files and `/etc/environment`
//! - OS-specific service installation and control helpers

mod environment;
pub mod interface;
mod properties;
mod service_install;

pub use environment::*;
pub use properties::*;
pub use service_install::*;

/// Returns `true` if the system uses systemd (detects `/run/systemd/system`).
pub fn is_systemd() -> bool {
    std::path::Path::new("/run/systemd/system").exists()
}
