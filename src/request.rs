use crate::path_util;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// How the backup is materialized at the destination.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    /// Mirror the tree as plain files and directories.
    #[default]
    Copy,
    /// Write the tree into a single zip archive.
    Archive,
}

/// Supported compression level for archive backups.
#[derive(ValueEnum, Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Fastest,
    Faster,
    #[default]
    Default,
    Better,
    Best,
}

impl Level {
    /// Deflate level passed to the archive writer.
    pub fn deflate_level(self) -> i64 {
        match self {
            Level::Fastest => 1,
            Level::Faster => 3,
            Level::Default => 6,
            Level::Better => 7,
            Level::Best => 9,
        }
    }
}

/// A single backup run: what to back up, where, and how.
///
/// Built once from validated input; nothing mutates it once traversal starts.
#[derive(Debug, Clone)]
pub struct BackupRequest {
    /// Absolute source directory.
    pub source_root: PathBuf,
    /// Absolute destination directory.
    pub dest_root: PathBuf,
    /// Optional folder name (copy mode) or archive file stem (archive mode).
    pub archive_name: Option<String>,
    pub mode: Mode,
    pub level: Level,
    /// Paths relative to the source root that are left out of the backup.
    pub ignore: Vec<PathBuf>,
}

impl BackupRequest {
    pub fn new(source_root: impl Into<PathBuf>, dest_root: impl Into<PathBuf>, mode: Mode) -> Self {
        Self {
            source_root: source_root.into(),
            dest_root: dest_root.into(),
            archive_name: None,
            mode,
            level: Level::default(),
            ignore: vec![],
        }
    }

    pub fn with_name(mut self, name: Option<String>) -> Self {
        self.archive_name = name.filter(|n| !n.is_empty());
        self
    }

    pub fn with_level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    pub fn with_ignore<I, P>(mut self, ignore: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.ignore = ignore.into_iter().map(Into::into).collect();
        self
    }

    /// Folder name the backup nests under, derived from the source root.
    pub fn base_name(&self) -> String {
        path_util::base_name(&self.source_root)
    }

    /// Directory the copy-mode backup folder is placed in.
    pub fn copy_root(&self) -> PathBuf {
        match &self.archive_name {
            Some(name) => self.dest_root.join(name),
            None => self.dest_root.clone(),
        }
    }

    /// Location of the archive file, computed once per run.
    pub fn archive_path(&self) -> PathBuf {
        let stem = match &self.archive_name {
            Some(name) => name.clone(),
            None => self.base_name(),
        };
        self.dest_root.join(format!("{stem}.zip"))
    }

    /// The top-level path a finished backup lives at.
    pub fn backup_location(&self) -> PathBuf {
        match self.mode {
            Mode::Copy => self.copy_root().join(self.base_name()),
            Mode::Archive => self.archive_path(),
        }
    }
}
