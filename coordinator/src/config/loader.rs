//! Configuration loading utilities for the coordinator.
//!
//! This module provides functions for reading and parsing
//! the deployment descriptor and the runtime options from disk.

use std::{io, path::Path};

use eyre::WrapErr as _;
use tokio::fs;

use crate::config::{Config, DistConfig, Options};

/// Reads and parses the deployment descriptor, resolving relative paths against its location.
///
/// # Errors
///
/// Returns an error if the descriptor cannot be read or parsed.
pub async fn load_dist<P: AsRef<Path>>(path: P) -> eyre::Result<DistConfig> {
    let path_ref = path.as_ref();
    let content = fs::read_to_string(path_ref).await.wrap_err(format!(
        "Failed to read deployment descriptor at: {}",
        path_ref.display()
    ))?;
    let mut dist: DistConfig = toml::from_str(&content).wrap_err(format!(
        "Failed to parse deployment descriptor as TOML at: {}",
        path_ref.display()
    ))?;
    dist.resolve_relative_paths(path_ref);
    Ok(dist)
}

/// Reads and parses the runtime options. A missing file means all defaults.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read or parsed.
pub async fn load_options<P: AsRef<Path>>(path: P) -> eyre::Result<Options> {
    let path_ref = path.as_ref();
    let content = match fs::read_to_string(path_ref).await {
        Ok(content) => content,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Options::default()),
        Err(e) => {
            return Err(e).wrap_err(format!(
                "Failed to read options at: {}",
                path_ref.display()
            ));
        }
    };
    toml::from_str(&content).wrap_err(format!(
        "Failed to parse options as TOML at: {}",
        path_ref.display()
    ))
}

/// Loads everything a handler invocation needs.
///
/// # Errors
///
/// Returns an error if either file cannot be loaded.
pub async fn load(dist_path: &Path, options_path: &Path, unit_name: &str) -> eyre::Result<Config> {
    Ok(Config {
        dist: load_dist(dist_path).await?,
        options: load_options(options_path).await?,
        unit_name: unit_name.to_owned(),
    })
}
