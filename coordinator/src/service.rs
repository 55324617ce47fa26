//! Control of the broker service under the configured init system.

use std::path::PathBuf;

use kafka_charm_common::{openrc, serviceless, systemd};
use tracing::{info, warn};

use crate::config::{Config, InitSystem};

/// Starts and stops the broker. Calls block until the service manager returns.
pub trait ServiceControl {
    /// # Errors
    ///
    /// Returns `Err` with the service manager's complaint if the broker can't be started.
    fn start(&self) -> Result<(), String>;
    /// # Errors
    ///
    /// Returns `Err` with the service manager's complaint if the broker can't be stopped.
    fn stop(&self) -> Result<(), String>;
    /// Stops, then starts. A failed stop only means there was nothing running.
    ///
    /// # Errors
    ///
    /// Returns `Err` if starting fails.
    fn restart(&self) -> Result<(), String> {
        if let Err(reason) = self.stop() {
            warn!(%reason, "Stop before restart failed, starting anyway");
        }
        self.start()
    }
}

/// [`ServiceControl`] through systemd, `OpenRC` or the distribution's own scripts.
#[derive(Debug, Clone)]
pub struct InitService {
    init_system: InitSystem,
    name: String,
    kafka_home: PathBuf,
    server_properties: PathBuf,
}

impl InitService {
    /// `init_system` must already be detected, see [`InitSystem::detect`].
    pub fn new(config: &Config, init_system: InitSystem) -> Self {
        let dirs = &config.dist.dirs;
        Self {
            init_system,
            name: config.dist.service.name.clone(),
            kafka_home: dirs.kafka.path.clone(),
            server_properties: dirs.kafka_conf.path.join("server.properties"),
        }
    }
}

impl ServiceControl for InitService {
    fn start(&self) -> Result<(), String> {
        info!(service = %self.name, init_system = ?self.init_system, "Starting broker");
        match self.init_system {
            InitSystem::Systemd => systemd::start(&self.name),
            InitSystem::OpenRc => openrc::start(&self.name),
            InitSystem::Serviceless | InitSystem::Auto => {
                serviceless::start(&self.kafka_home, &self.server_properties)
            }
        }
    }

    fn stop(&self) -> Result<(), String> {
        info!(service = %self.name, init_system = ?self.init_system, "Stopping broker");
        match self.init_system {
            InitSystem::Systemd => systemd::stop(&self.name),
            InitSystem::OpenRc => openrc::stop(&self.name),
            InitSystem::Serviceless | InitSystem::Auto => serviceless::stop(&self.kafka_home),
        }
    }
}
