//! The relation to downstream Kafka clients.

use std::{
    fs,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};

use super::{Peer, PeerError};

/// What downstream consumers get from the broker once it is ready.
pub trait ClientRelation {
    /// Whether any client application is related.
    fn is_joined(&self) -> bool;
    /// Publishes the broker port.
    ///
    /// # Errors
    ///
    /// Returns [`PeerError::Publish`] if the data can't be published.
    fn send_port(&mut self, port: u16) -> Result<(), PeerError>;
    /// Publishes the Zookeeper ensemble the broker uses.
    ///
    /// # Errors
    ///
    /// Returns [`PeerError::Publish`] if the data can't be published.
    fn send_peer_list(&mut self, peers: &[Peer]) -> Result<(), PeerError>;
}

#[derive(Debug, Default, Deserialize)]
struct ClientRelationData {
    #[serde(default)]
    joined: bool,
}

/// Data published to clients.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishedClientData {
    pub port: Option<u16>,
    #[serde(default)]
    pub zookeepers: Vec<Peer>,
}

/// [`ClientRelation`] that reads `client.toml` and publishes `client.published.json`.
#[derive(Debug, Clone)]
pub struct FileClientRelation {
    joined: bool,
    published_path: PathBuf,
    published: PublishedClientData,
}

impl FileClientRelation {
    pub const FILE_NAME: &'static str = "client.toml";
    pub const PUBLISHED_FILE_NAME: &'static str = "client.published.json";

    /// Reads the relation state; anything unreadable counts as "no client joined".
    pub fn load(relations_dir: &Path) -> Self {
        let joined = fs::read_to_string(relations_dir.join(Self::FILE_NAME))
            .ok()
            .and_then(|content| toml::from_str::<ClientRelationData>(&content).ok())
            .unwrap_or_default()
            .joined;
        let published_path = relations_dir.join(Self::PUBLISHED_FILE_NAME);
        let published = fs::read_to_string(&published_path)
            .ok()
            .and_then(|content| serde_json::from_str(&content).ok())
            .unwrap_or_default();
        Self {
            joined,
            published_path,
            published,
        }
    }

    pub const fn published(&self) -> &PublishedClientData {
        &self.published
    }

    fn publish(&self) -> Result<(), PeerError> {
        let content = serde_json::to_string_pretty(&self.published)
            .map_err(|e| PeerError::Publish(e.to_string()))?;
        fs::write(&self.published_path, content)
            .map_err(|e| PeerError::Publish(format!("{}: {e}", self.published_path.display())))
    }
}

impl ClientRelation for FileClientRelation {
    fn is_joined(&self) -> bool {
        self.joined
    }

    fn send_port(&mut self, port: u16) -> Result<(), PeerError> {
        self.published.port = Some(port);
        self.publish()
    }

    fn send_peer_list(&mut self, peers: &[Peer]) -> Result<(), PeerError> {
        self.published.zookeepers = peers.to_vec();
        self.publish()
    }
}
