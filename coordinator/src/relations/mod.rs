//! Collaborators representing the units this one is related to.
//!
//! The orchestration runtime publishes relation data as files in the relations directory;
//! [`zookeeper`] reads the ensemble the broker connects to, [`client`] publishes connection
//! details to downstream consumers.

pub mod client;
pub mod zookeeper;

use std::net::{IpAddr, ToSocketAddrs as _};

use serde::{Deserialize, Serialize};
use thiserror::Error as ThisError;
use tracing::warn;

pub use client::{ClientRelation, FileClientRelation};
pub use zookeeper::{FileZookeeperRelation, ZookeeperRelation};

/// A remote ensemble member.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Peer {
    pub host: String,
    pub port: u16,
}

/// Errors from relation collaborators.
#[derive(Debug, ThisError)]
pub enum PeerError {
    /// The peer list couldn't be retrieved. Callers reconfiguring a running broker skip the
    /// attempt and wait for the next event.
    #[error("Failed to discover Zookeeper peers: {0}")]
    Discovery(String),
    #[error("Failed to publish relation data: {0}")]
    Publish(String),
}

/// Coarse view of the Zookeeper relation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PeerStatus {
    /// No relation to Zookeeper.
    Absent,
    /// Related, but the ensemble hasn't published its members yet.
    Connected,
    Ready,
}

impl PeerStatus {
    /// Reads the status off a relation.
    pub fn of<R: ZookeeperRelation + ?Sized>(relation: &R) -> Self {
        if relation.is_ready() {
            Self::Ready
        } else if relation.is_connected() {
            Self::Connected
        } else {
            Self::Absent
        }
    }
}

/// Resolves a peer host to the address the broker should dial.
///
/// Literal IPs are kept. Host names go through the system resolver, IPv4 preferred;
/// names that don't resolve are kept verbatim.
pub fn resolve_private_address(host: &str) -> String {
    if host.parse::<IpAddr>().is_ok() {
        return host.to_owned();
    }
    match (host, 0).to_socket_addrs() {
        Ok(addrs) => {
            let addrs = addrs.map(|addr| addr.ip()).collect::<Vec<_>>();
            addrs
                .iter()
                .find(|ip| ip.is_ipv4())
                .or_else(|| addrs.first())
                .map_or_else(|| host.to_owned(), ToString::to_string)
        }
        Err(e) => {
            warn!(%host, error = %e, "Could not resolve peer host, using it verbatim");
            host.to_owned()
        }
    }
}

/// Builds the `zookeeper.connect` value: `ip:port` pairs, sorted, comma separated.
///
/// Sorting makes the result independent of discovery order, so a reordered peer list never
/// looks like a configuration change.
pub fn connection_string(peers: &[Peer]) -> String {
    let mut members = peers
        .iter()
        .map(|peer| format!("{}:{}", resolve_private_address(&peer.host), peer.port))
        .collect::<Vec<_>>();
    members.sort();
    members.join(",")
}
