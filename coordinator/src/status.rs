//! Operator-visible unit status.

use core::fmt;
use std::{
    fs,
    path::{Path, PathBuf},
};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

/// Workload state as shown to operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkloadState {
    #[default]
    Maintenance,
    Blocked,
    Waiting,
    Active,
}

impl fmt::Display for WorkloadState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match *self {
            Self::Maintenance => "maintenance",
            Self::Blocked => "blocked",
            Self::Waiting => "waiting",
            Self::Active => "active",
        };
        f.write_str(s)
    }
}

/// Where the coordinator reports status and opened ports.
pub trait StatusSink {
    fn status_set(&mut self, state: WorkloadState, message: &str);
    fn open_port(&mut self, port: u16);
}

/// Contents of `status.json`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusRecord {
    pub state: WorkloadState,
    pub message: String,
    #[serde(default)]
    pub opened_ports: Vec<u16>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// [`StatusSink`] that keeps `<state_dir>/status.json` current.
///
/// Write failures are logged rather than failing the handler; the status is informational.
#[derive(Debug, Clone)]
pub struct StatusFile {
    path: PathBuf,
    record: StatusRecord,
}

impl StatusFile {
    pub const FILE_NAME: &'static str = "status.json";

    pub fn load(state_dir: &Path) -> Self {
        let path = state_dir.join(Self::FILE_NAME);
        let record = Self::read(&path).unwrap_or_default();
        Self { path, record }
    }

    /// Reads a status record without keeping a handle to it.
    pub fn read(path: &Path) -> Option<StatusRecord> {
        fs::read_to_string(path)
            .ok()
            .and_then(|content| serde_json::from_str(&content).ok())
    }

    fn persist(&mut self) {
        self.record.updated_at = Some(Utc::now());
        let result = self
            .path
            .parent()
            .map_or(Ok(()), fs::create_dir_all)
            .and_then(|()| {
                let content = serde_json::to_string_pretty(&self.record)?;
                fs::write(&self.path, content)
            });
        if let Err(e) = result {
            error!(path = ?self.path, error = %e, "Failed to write status record");
        }
    }
}

impl StatusSink for StatusFile {
    fn status_set(&mut self, state: WorkloadState, message: &str) {
        info!(%state, message, "Status");
        if self.record.state == state && self.record.message == message {
            return;
        }
        self.record.state = state;
        message.clone_into(&mut self.record.message);
        self.persist();
    }

    fn open_port(&mut self, port: u16) {
        if self.record.opened_ports.contains(&port) {
            return;
        }
        info!(port, "Opening port");
        self.record.opened_ports.push(port);
        self.record.opened_ports.sort_unstable();
        self.persist();
    }
}
