//! Editing of `/etc/environment` style `KEY="value"` files.

use std::{fs, io, path::Path};

/// Ordered contents of an environment file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Environment {
    entries: Vec<(String, String)>,
}

impl Environment {
    /// Parses `KEY=value` lines, stripping optional surrounding quotes. Other lines are dropped.
    pub fn parse(content: &str) -> Self {
        let entries = content
            .lines()
            .filter_map(|line| {
                let (key, value) = line.trim().split_once('=')?;
                let value = value.trim();
                let unquoted = value
                    .strip_prefix('"')
                    .and_then(|v| v.strip_suffix('"'))
                    .unwrap_or(value);
                Some((key.trim().to_owned(), unquoted.to_owned()))
            })
            .collect();
        Self { entries }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|&&(ref k, _)| k == key)
            .map(|&(_, ref v)| v.as_str())
    }

    /// Sets `key`, keeping its position if it already exists.
    pub fn set(&mut self, key: &str, value: impl Into<String>) {
        let value = value.into();
        if let Some(entry) = self.entries.iter_mut().find(|entry| entry.0 == key) {
            entry.1 = value;
        } else {
            self.entries.push((key.to_owned(), value));
        }
    }

    /// Appends `dir` to the `:`-separated `PATH` unless it's already present.
    pub fn append_to_path(&mut self, dir: &str) {
        let path = self.get("PATH").unwrap_or_default();
        if path.split(':').any(|existing| existing == dir) {
            return;
        }
        let updated = if path.is_empty() {
            dir.to_owned()
        } else {
            format!("{path}:{dir}")
        };
        self.set("PATH", updated);
    }

    pub fn render(&self) -> String {
        self.entries
            .iter()
            .map(|&(ref k, ref v)| format!("{k}=\"{v}\"\n"))
            .collect()
    }
}

/// Loads the environment file at `path`, lets `edit` modify it and writes it back.
///
/// A missing file is treated as empty.
///
/// # Errors
///
/// Returns `Err` if the file exists but can't be read, or can't be written.
pub fn edit_environment_in_place(
    path: &Path,
    edit: impl FnOnce(&mut Environment),
) -> Result<(), io::Error> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == io::ErrorKind::NotFound => String::new(),
        Err(e) => return Err(e),
    };
    let mut env = Environment::parse(&content);
    edit(&mut env);
    fs::write(path, env.render())
}
