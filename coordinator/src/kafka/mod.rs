//! The Kafka installation driven by the lifecycle handlers.
//!
//! [`install`] lays the distribution out on disk once, [`configure`] rewrites the
//! Zookeeper-dependent property lines whenever the ensemble or the bind selector changes.

mod configure;
mod install;

use std::{
    fs,
    path::{Path, PathBuf},
};

use sha2::{Digest as _, Sha256};

pub use configure::Rendered;

use crate::{config::Config, lifecycle::HandlerError};

pub const SERVER_PROPERTIES: &str = "server.properties";
pub const CONSUMER_PROPERTIES: &str = "consumer.properties";
pub const PRODUCER_PROPERTIES: &str = "producer.properties";
pub const LOG4J_PROPERTIES: &str = "log4j.properties";

/// Handle on the Kafka installation described by a [`Config`].
#[derive(Debug, Clone, Copy)]
pub struct Kafka<'cfg> {
    config: &'cfg Config,
}

impl<'cfg> Kafka<'cfg> {
    pub const fn new(config: &'cfg Config) -> Self {
        Self { config }
    }

    pub fn home(&self) -> &'cfg Path {
        &self.config.dist.dirs.kafka.path
    }

    pub fn conf_dir(&self) -> &'cfg Path {
        &self.config.dist.dirs.kafka_conf.path
    }

    pub fn property_file(&self, name: &str) -> PathBuf {
        self.conf_dir().join(name)
    }

    /// SHA-256 of `server.properties` as it is on disk, hex encoded.
    ///
    /// # Errors
    ///
    /// Returns [`HandlerError::Io`] if the file can't be read.
    pub fn server_digest(&self) -> Result<String, HandlerError> {
        let path = self.property_file(SERVER_PROPERTIES);
        let content = fs::read(&path).map_err(HandlerError::io(&path))?;
        Ok(hex::encode(Sha256::digest(&content)))
    }
}
