//! Persisted lifecycle flags of this unit.
//!
//! Only the flags the coordinator owns are stored; whether Zookeeper is connected or ready is
//! observed from the relation on every invocation.

use std::{
    fs, io,
    path::{Path, PathBuf},
};

use eyre::WrapErr as _;
use serde::{Deserialize, Serialize};

use crate::relations::PeerStatus;

/// Coarse installation phase of the broker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    #[default]
    Uninstalled,
    Installed,
    Started,
}

/// Everything remembered between invocations.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitState {
    pub phase: Phase,
    /// `zookeeper.connect` value last rendered.
    #[serde(default)]
    pub zookeeper_connect: Option<String>,
    /// `network_interface` option last rendered.
    #[serde(default)]
    pub network_interface: Option<String>,
    /// SHA-256 of `server.properties` as last rendered.
    #[serde(default)]
    pub server_digest: Option<String>,
}

impl UnitState {
    /// Named flags currently raised, for display.
    pub fn flags(&self, peers: PeerStatus) -> Vec<&'static str> {
        let mut flags = Vec::new();
        if self.phase != Phase::Uninstalled {
            flags.push("kafka.installed");
        }
        if peers != PeerStatus::Absent {
            flags.push("zookeeper.joined");
        }
        if peers == PeerStatus::Ready {
            flags.push("zookeeper.ready");
        }
        if self.phase == Phase::Started {
            flags.push("kafka.started");
        }
        flags
    }
}

/// JSON file holding the [`UnitState`].
#[derive(Debug, Clone)]
pub struct StateStore {
    path: PathBuf,
}

impl StateStore {
    pub const FILE_NAME: &'static str = "state.json";

    pub fn new(state_dir: &Path) -> Self {
        Self {
            path: state_dir.join(Self::FILE_NAME),
        }
    }

    /// Loads the stored state; a unit that never ran starts out [`Phase::Uninstalled`].
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but can't be read or parsed.
    pub fn load(&self) -> eyre::Result<UnitState> {
        match fs::read_to_string(&self.path) {
            Ok(content) => serde_json::from_str(&content)
                .wrap_err(format!("Corrupt unit state at {}", self.path.display())),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(UnitState::default()),
            Err(e) => {
                Err(e).wrap_err(format!("Failed to read unit state at {}", self.path.display()))
            }
        }
    }

    /// # Errors
    ///
    /// Returns an error if the state can't be written.
    pub fn save(&self, state: &UnitState) -> eyre::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).wrap_err("Failed to create state directory")?;
        }
        let content = serde_json::to_string_pretty(state)?;
        fs::write(&self.path, content)
            .wrap_err(format!("Failed to write unit state at {}", self.path.display()))
    }
}
