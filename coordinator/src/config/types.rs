//! Configuration data types for the coordinator.
//!
//! The static deployment descriptor (`dist.toml`) describes where the distribution lives and
//! which ports, users and directories it needs. The runtime options (`options.toml`) are the
//! operator-tunable knobs that may change between invocations.

use std::{
    collections::BTreeMap,
    env,
    path::{Component, Path, PathBuf},
};

use serde::{Deserialize, Serialize};

/// Init system used to run the broker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum InitSystem {
    /// Pick systemd or `OpenRC` from the running host, falling back to serviceless.
    #[default]
    Auto,
    Systemd,
    #[serde(rename = "openrc")]
    #[value(name = "openrc")]
    OpenRc,
    /// No init system; the distribution's start/stop scripts are invoked directly.
    Serviceless,
}

impl InitSystem {
    /// Replaces [`InitSystem::Auto`] with what the host actually runs.
    #[must_use]
    pub fn detect(self) -> Self {
        match self {
            Self::Auto => {
                if kafka_charm_common::is_systemd() {
                    Self::Systemd
                } else if kafka_charm_common::is_openrc() {
                    Self::OpenRc
                } else {
                    Self::Serviceless
                }
            }
            other => other,
        }
    }
}

/// Whether a reconfiguration restarts the broker only when `server.properties` changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum RestartPolicy {
    #[default]
    OnChange,
    Always,
}

/// `[service]` section of the deployment descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ServiceConfig {
    /// Name of the service unit.
    #[serde(default = "default_service_name")]
    pub name: String,
    #[serde(default)]
    pub init_system: InitSystem,
    /// User the broker runs as, substituted into the unit template.
    #[serde(default = "default_service_user")]
    pub user: String,
    #[serde(default = "default_systemd_unit_dir")]
    pub systemd_unit_dir: PathBuf,
    #[serde(default = "default_openrc_init_dir")]
    pub openrc_init_dir: PathBuf,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: default_service_name(),
            init_system: InitSystem::default(),
            user: default_service_user(),
            systemd_unit_dir: default_systemd_unit_dir(),
            openrc_init_dir: default_openrc_init_dir(),
        }
    }
}

/// `[paths]` section: host files and directories outside the distribution itself.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PathsConfig {
    /// Directory holding the unpacked distribution resources.
    #[serde(default = "default_resources_dir")]
    pub resources: PathBuf,
    /// Where flags and the status record are kept.
    #[serde(default = "default_state_dir")]
    pub state: PathBuf,
    /// Where the orchestration runtime publishes relation data.
    #[serde(default = "default_relations_dir")]
    pub relations: PathBuf,
    #[serde(default = "default_environment_file")]
    pub environment_file: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            resources: default_resources_dir(),
            state: default_state_dir(),
            relations: default_relations_dir(),
            environment_file: default_environment_file(),
        }
    }
}

/// A directory the deployment needs, with optional ownership.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DirSpec {
    pub path: PathBuf,
    /// User owning the directory; its primary group is used as well.
    #[serde(default)]
    pub owner: Option<String>,
    /// Octal permission bits, e.g. `0o755`.
    #[serde(default)]
    pub mode: Option<u32>,
}

/// `[dirs.*]` tables of the deployment descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct KafkaDirs {
    /// Install location of the distribution (`KAFKA_HOME`).
    pub kafka: DirSpec,
    pub kafka_conf: DirSpec,
    pub kafka_app_logs: DirSpec,
    pub kafka_data_logs: DirSpec,
}

impl KafkaDirs {
    pub fn all(&self) -> [&DirSpec; 4] {
        [
            &self.kafka,
            &self.kafka_conf,
            &self.kafka_app_logs,
            &self.kafka_data_logs,
        ]
    }

    fn all_mut(&mut self) -> [&mut DirSpec; 4] {
        [
            &mut self.kafka,
            &mut self.kafka_conf,
            &mut self.kafka_app_logs,
            &mut self.kafka_data_logs,
        ]
    }
}

/// A port the service listens on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct PortSpec {
    pub port: u16,
    /// Whether the port should be opened to the outside.
    #[serde(default)]
    pub exposed: bool,
}

/// A system user the deployment needs.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Default)]
pub struct UserSpec {
    #[serde(default)]
    pub groups: Vec<String>,
}

/// Root of the deployment descriptor (`dist.toml`).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DistConfig {
    #[serde(default)]
    pub service: ServiceConfig,
    #[serde(default)]
    pub paths: PathsConfig,
    /// Resource names by key. `kafka` defaults to `kafka-<arch>`.
    #[serde(default)]
    pub resources: BTreeMap<String, String>,
    #[serde(default)]
    pub groups: Vec<String>,
    #[serde(default)]
    pub users: BTreeMap<String, UserSpec>,
    pub dirs: KafkaDirs,
    pub ports: BTreeMap<String, PortSpec>,
}

impl DistConfig {
    /// The broker port (`[ports.kafka]`).
    ///
    /// # Errors
    ///
    /// Returns an error if the descriptor has no `kafka` port.
    pub fn kafka_port(&self) -> eyre::Result<u16> {
        self.ports
            .get("kafka")
            .map(|spec| spec.port)
            .ok_or_else(|| eyre::eyre!("Deployment descriptor has no [ports.kafka] entry"))
    }

    /// Ports marked as exposed, in key order.
    pub fn exposed_ports(&self) -> Vec<u16> {
        self.ports
            .values()
            .filter(|spec| spec.exposed)
            .map(|spec| spec.port)
            .collect()
    }

    /// Location of the unpacked Kafka distribution resource.
    pub fn kafka_resource(&self) -> PathBuf {
        let name = self
            .resources
            .get("kafka")
            .cloned()
            .unwrap_or_else(|| format!("kafka-{}", env::consts::ARCH));
        self.paths.resources.join(name)
    }

    /// Makes every relative path absolute, relative to the descriptor's own location.
    pub(crate) fn resolve_relative_paths(&mut self, descriptor_path: &Path) {
        for dir in self.dirs.all_mut() {
            dir.path = resolve_config_relative_paths(descriptor_path, &dir.path);
        }
        let paths = &mut self.paths;
        for path in [
            &mut paths.resources,
            &mut paths.state,
            &mut paths.relations,
            &mut paths.environment_file,
        ] {
            *path = resolve_config_relative_paths(descriptor_path, path);
        }
        let service = &mut self.service;
        for path in [&mut service.systemd_unit_dir, &mut service.openrc_init_dir] {
            *path = resolve_config_relative_paths(descriptor_path, path);
        }
    }
}

/// Runtime-supplied options (`options.toml`).
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize, Serialize)]
pub struct Options {
    /// Interface name, CIDR range or wildcard the broker should bind to.
    #[serde(default)]
    pub network_interface: Option<String>,
    /// Advertised host name; defaults to `hostname -s`.
    #[serde(default)]
    pub hostname: Option<String>,
    #[serde(default)]
    pub restart_policy: RestartPolicy,
}

/// Everything a handler invocation reads, loaded once and passed by reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub dist: DistConfig,
    pub options: Options,
    /// Unit name as assigned by the orchestration runtime, e.g. `kafka/0`.
    pub unit_name: String,
}

impl Config {
    /// The unit number of `service/N` unit names, used as the broker id.
    ///
    /// # Errors
    ///
    /// Returns an error if the unit name has no `/N` suffix.
    pub fn unit_number(&self) -> eyre::Result<&str> {
        self.unit_name
            .split_once('/')
            .map(|(_, number)| number)
            .filter(|number| !number.is_empty())
            .ok_or_else(|| eyre::eyre!("Unit name {:?} has no unit number", self.unit_name))
    }
}

fn default_service_name() -> String {
    "kafka".to_owned()
}

fn default_service_user() -> String {
    "kafka".to_owned()
}

fn default_systemd_unit_dir() -> PathBuf {
    PathBuf::from("/etc/systemd/system")
}

fn default_openrc_init_dir() -> PathBuf {
    PathBuf::from("/etc/init.d")
}

fn default_resources_dir() -> PathBuf {
    PathBuf::from("./resources")
}

fn default_state_dir() -> PathBuf {
    PathBuf::from("/var/lib/kafka_charm")
}

fn default_relations_dir() -> PathBuf {
    PathBuf::from("/var/lib/kafka_charm/relations")
}

fn default_environment_file() -> PathBuf {
    PathBuf::from("/etc/environment")
}

/// Resolves a path to an absolute one.
///
/// If the path is absolute, returns it as-is. If relative, joins it with the
/// config file's parent directory and normalizes the result to remove redundant
/// components like `./`.
pub fn resolve_config_relative_paths(config_path: &Path, relative_path: &Path) -> PathBuf {
    let resolved = if relative_path.is_absolute() {
        relative_path.to_path_buf()
    } else {
        config_path
            .parent()
            .map_or_else(|| relative_path.to_path_buf(), |d| d.join(relative_path))
    };

    // We can't use canonicalize() because the path might not exist yet
    normalize_path(&resolved)
}

fn normalize_path(path: &Path) -> PathBuf {
    let mut result = PathBuf::new();
    for component in path.components() {
        use Component as C;
        match component {
            C::Normal(c) => {
                result.push(c);
            }
            C::ParentDir => {
                result.pop();
            }
            C::CurDir => {}
            C::RootDir | C::Prefix(_) => {
                result.push(component);
            }
        }
    }
    result
}
