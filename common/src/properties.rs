//! Editing of line-oriented `key=value` property files.
//!
//! Lines are rewritten wholesale: a line matched by an edit's pattern has the matched part
//! replaced by the literal replacement. Patterns are expected to be anchored at line start and
//! run to end of line (e.g. `^#?host.name=.*`), so in practice the whole line is replaced.

use std::{
    fs, io,
    path::{Path, PathBuf},
};

use regex::{NoExpand, Regex};
use thiserror::Error as ThisError;

/// Errors from editing property files.
#[derive(Debug, ThisError)]
pub enum PropertiesError {
    #[error("Failed to access property file {path:?}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Invalid line pattern {0:?}")]
    Pattern(String, #[source] regex::Error),
}

/// A single line substitution.
#[derive(Debug, Clone)]
pub struct LineEdit {
    pattern: Regex,
    replacement: String,
}

impl LineEdit {
    /// Compiles a line substitution.
    ///
    /// # Errors
    ///
    /// Returns [`PropertiesError::Pattern`] if `pattern` isn't a valid regex.
    pub fn new(pattern: &str, replacement: impl Into<String>) -> Result<Self, PropertiesError> {
        let compiled =
            Regex::new(pattern).map_err(|e| PropertiesError::Pattern(pattern.to_owned(), e))?;
        Ok(Self {
            pattern: compiled,
            replacement: replacement.into(),
        })
    }

    /// Shorthand for the common `^key=.*` -> `key=value` edit.
    ///
    /// # Errors
    ///
    /// Returns [`PropertiesError::Pattern`] if `key` produces an invalid regex.
    pub fn key(key: &str, value: impl core::fmt::Display) -> Result<Self, PropertiesError> {
        Self::new(&format!("^{key}=.*"), format!("{key}={value}"))
    }

    /// Like [`LineEdit::key`], but also matches a commented-out `#key=` line.
    ///
    /// # Errors
    ///
    /// Returns [`PropertiesError::Pattern`] if `key` produces an invalid regex.
    pub fn uncomment_key(key: &str, value: impl core::fmt::Display) -> Result<Self, PropertiesError> {
        Self::new(&format!("^#?{key}=.*"), format!("{key}={value}"))
    }
}

/// Applies `edits` to every line of `content`, in order.
pub fn apply_edits(content: &str, edits: &[LineEdit]) -> String {
    let mut out = String::with_capacity(content.len());
    for raw_line in content.split_inclusive('\n') {
        let (body, newline) = match raw_line.strip_suffix('\n') {
            Some(body) => (body, "\n"),
            None => (raw_line, ""),
        };
        let mut line = body.to_owned();
        for edit in edits {
            line = edit
                .pattern
                .replace(&line, NoExpand(&edit.replacement))
                .into_owned();
        }
        out.push_str(&line);
        out.push_str(newline);
    }
    out
}

/// Rewrites the file at `path` with `edits` applied.
///
/// Returns whether the file content changed; an unchanged file is not written.
///
/// # Errors
///
/// Returns [`PropertiesError::Io`] if the file can't be read or written.
pub fn re_edit_in_place(path: &Path, edits: &[LineEdit]) -> Result<bool, PropertiesError> {
    let io_err = |source| PropertiesError::Io {
        path: path.to_path_buf(),
        source,
    };
    let before = fs::read_to_string(path).map_err(io_err)?;
    let after = apply_edits(&before, edits);
    if after == before {
        return Ok(false);
    }
    fs::write(path, after).map_err(io_err)?;
    Ok(true)
}

/// Finds the value of the first uncommented `key=value` line.
pub fn find_value(content: &str, key: &str) -> Option<String> {
    content.lines().find_map(|line| {
        line.strip_prefix(key)
            .and_then(|rest| rest.strip_prefix('='))
            .map(|value| value.trim_end_matches('\r').to_owned())
    })
}
