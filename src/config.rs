//! Optional run settings read from a TOML file given on the command line.
//!
//! ```toml
//! name = "weekly"
//! archive = true
//! level = "best"
//! ignore = ["target", ".cache"]
//! ```

use crate::request::Level;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct BackupOptions {
    /// Folder name (copy mode) or archive file stem (archive mode).
    pub name: Option<String>,
    /// Write a zip archive instead of a directory copy.
    pub archive: bool,
    /// Compression level for archive backups.
    pub level: Option<Level>,
    /// Paths relative to the source to leave out.
    pub ignore: Vec<String>,
}

impl BackupOptions {
    /// Reads options from a TOML file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or is not valid TOML.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file '{}'", path.display()))?;
        let options = toml::from_str(&content)
            .with_context(|| format!("Invalid config file '{}'", path.display()))?;
        Ok(options)
    }

    /// Overlays values given on the command line; they win over the file.
    pub fn merge(mut self, other: BackupOptions) -> Self {
        if other.name.is_some() {
            self.name = other.name;
        }
        self.archive |= other.archive;
        if other.level.is_some() {
            self.level = other.level;
        }
        if !other.ignore.is_empty() {
            self.ignore = other.ignore;
        }
        self
    }
}
