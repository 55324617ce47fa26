//! Operator actions run out of band of the lifecycle.

use std::{
    fs, io,
    path::{Path, PathBuf},
};

use kafka_charm_common::find_value;
use serde::{Deserialize, Serialize};
use thiserror::Error as ThisError;

use crate::kafka::SERVER_PROPERTIES;

/// Structured result of an action, printed as JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionOutput {
    pub output: String,
}

#[derive(Debug, ThisError)]
pub enum LookupError {
    #[error("Failed to read {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("No zookeeper.connect entry in {0:?}")]
    Missing(PathBuf),
}

/// Looks up the Zookeeper connection string the broker is configured with.
///
/// # Errors
///
/// Returns [`LookupError::Read`] if `server.properties` can't be read, or
/// [`LookupError::Missing`] if it has no `zookeeper.connect` line.
pub fn get_zookeepers(kafka_conf: &Path) -> Result<ActionOutput, LookupError> {
    let path = kafka_conf.join(SERVER_PROPERTIES);
    let content = fs::read_to_string(&path).map_err(|source| LookupError::Read {
        path: path.clone(),
        source,
    })?;
    find_value(&content, "zookeeper.connect")
        .map(|output| ActionOutput { output })
        .ok_or(LookupError::Missing(path))
}
