use std::{io, path::PathBuf};

use kafka_charm_common::{PropertiesError, interface::ResolveError};
use thiserror::Error as ThisError;

use crate::relations::PeerError;

/// Failures that end a handler invocation and leave the unit blocked.
#[derive(Debug, ThisError)]
pub enum HandlerError {
    #[error("Missing Kafka resource artifacts: {}", display_paths(.missing))]
    InstallVerificationFailed { missing: Vec<PathBuf> },
    #[error(transparent)]
    Resolve(#[from] ResolveError),
    #[error(transparent)]
    Properties(#[from] PropertiesError),
    #[error(transparent)]
    Peer(#[from] PeerError),
    #[error("Service manager failed: {0}")]
    Service(String),
    /// Account creation or host inspection failed.
    #[error("{0}")]
    System(String),
    #[error("Failed to set up {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Invalid configuration: {0}")]
    Config(eyre::Report),
}

impl HandlerError {
    pub(crate) fn io(path: impl Into<PathBuf>) -> impl FnOnce(io::Error) -> Self {
        let path = path.into();
        move |source| Self::Io { path, source }
    }
}

fn display_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|path| path.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
