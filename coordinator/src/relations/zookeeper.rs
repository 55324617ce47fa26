//! The relation to the Zookeeper ensemble.

use core::mem;
use std::{
    fs, io,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{Peer, PeerError};

/// What the broker needs from the Zookeeper relation.
pub trait ZookeeperRelation {
    /// Whether a Zookeeper application is related at all.
    fn is_connected(&self) -> bool;
    /// Whether the ensemble has published its members.
    fn is_ready(&self) -> bool;
    /// The current ensemble members, in discovery order.
    ///
    /// # Errors
    ///
    /// Returns [`PeerError::Discovery`] if the member list can't be retrieved.
    fn get_peers(&self) -> Result<Vec<Peer>, PeerError>;
    /// Whether units joined or departed since the last acknowledgement.
    fn has_pending_changes(&self) -> bool {
        false
    }
    /// Acknowledges departed units.
    ///
    /// # Errors
    ///
    /// Returns [`PeerError::Publish`] if the acknowledgement can't be recorded.
    fn notify_departing_handled(&mut self) -> Result<(), PeerError>;
    /// Acknowledges joined units.
    ///
    /// # Errors
    ///
    /// Returns [`PeerError::Publish`] if the acknowledgement can't be recorded.
    fn notify_joining_handled(&mut self) -> Result<(), PeerError>;
}

/// Relation data as published by the runtime in `zookeeper.toml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZookeeperRelationData {
    #[serde(default)]
    pub connected: bool,
    #[serde(default)]
    pub ready: bool,
    /// Units that joined and haven't been handled yet.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub joining: Vec<String>,
    /// Units that departed and haven't been handled yet.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub departing: Vec<String>,
    #[serde(default)]
    pub peers: Vec<Peer>,
}

/// [`ZookeeperRelation`] backed by `<relations_dir>/zookeeper.toml`.
#[derive(Debug, Clone)]
pub struct FileZookeeperRelation {
    path: PathBuf,
    data: ZookeeperRelationData,
}

impl FileZookeeperRelation {
    pub const FILE_NAME: &'static str = "zookeeper.toml";

    /// Reads the relation state. A missing or unreadable file means no relation.
    pub fn load(relations_dir: &Path) -> Self {
        let path = relations_dir.join(Self::FILE_NAME);
        let data = match read(&path) {
            Ok(Some(data)) => data,
            Ok(None) => {
                debug!(?path, "No Zookeeper relation data");
                ZookeeperRelationData::default()
            }
            Err(e) => {
                warn!(?path, error = %e, "Ignoring unreadable Zookeeper relation data");
                ZookeeperRelationData::default()
            }
        };
        Self { path, data }
    }

    /// Removes the units seen at [`FileZookeeperRelation::load`] from one pending list.
    ///
    /// The file is re-read first, so members and units the runtime published since the load
    /// are kept.
    fn acknowledge(
        &mut self,
        pending: fn(&mut ZookeeperRelationData) -> &mut Vec<String>,
    ) -> Result<(), PeerError> {
        let handled = mem::take(pending(&mut self.data));
        if handled.is_empty() {
            return Ok(());
        }
        let Some(mut current) = read(&self.path).map_err(PeerError::Publish)? else {
            debug!(path = ?self.path, "Relation data gone, nothing to acknowledge");
            return Ok(());
        };
        pending(&mut current).retain(|unit| !handled.contains(unit));
        let content = toml::to_string(&current).map_err(|e| PeerError::Publish(e.to_string()))?;
        fs::write(&self.path, content)
            .map_err(|e| PeerError::Publish(format!("{}: {e}", self.path.display())))
    }
}

fn read(path: &Path) -> Result<Option<ZookeeperRelationData>, String> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.to_string()),
    };
    toml::from_str(&content)
        .map(Some)
        .map_err(|e| e.to_string())
}

impl ZookeeperRelation for FileZookeeperRelation {
    fn is_connected(&self) -> bool {
        self.data.connected || self.data.ready
    }

    fn is_ready(&self) -> bool {
        self.data.ready
    }

    /// Re-reads the relation file, so a relation that went bad since [`FileZookeeperRelation::load`]
    /// is reported instead of silently using stale members.
    fn get_peers(&self) -> Result<Vec<Peer>, PeerError> {
        let data = read(&self.path)
            .map_err(PeerError::Discovery)?
            .ok_or_else(|| PeerError::Discovery(format!("{} is gone", self.path.display())))?;
        if data.peers.is_empty() {
            return Err(PeerError::Discovery(
                "relation is ready but lists no peers".to_owned(),
            ));
        }
        if let Some(peer) = data.peers.iter().find(|peer| peer.host.is_empty()) {
            return Err(PeerError::Discovery(format!(
                "peer on port {} has no host",
                peer.port
            )));
        }
        Ok(data.peers)
    }

    fn has_pending_changes(&self) -> bool {
        !self.data.joining.is_empty() || !self.data.departing.is_empty()
    }

    fn notify_departing_handled(&mut self) -> Result<(), PeerError> {
        self.acknowledge(|data| &mut data.departing)
    }

    fn notify_joining_handled(&mut self) -> Result<(), PeerError> {
        self.acknowledge(|data| &mut data.joining)
    }
}
