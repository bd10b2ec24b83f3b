//! Error taxonomy for a backup run.
//!
//! Every error names the path it concerns. Errors fall into three classes:
//! fatal errors abort the run, per-entry errors are counted and the walk
//! continues, durability errors are counted and then become the run's result.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// How an error affects the rest of the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Aborts the run immediately.
    Fatal,
    /// Counted against the entry, traversal proceeds.
    PerEntry,
    /// Counted against the entry, reported as the run's final error.
    Durability,
}

/// Everything that can go wrong while backing up a tree.
#[derive(Debug, Error)]
pub enum BackupError {
    #[error("Source path '{}' is unreachable: {source}", path.display())]
    SourceUnreachable { path: PathBuf, source: io::Error },

    #[error("Cannot create backup container '{}': {source}", path.display())]
    ContainerCreate {
        path: PathBuf,
        source: io::Error,
    },

    #[error("Non-regular source file '{}' ({kind})", path.display())]
    NonRegularSource { path: PathBuf, kind: String },

    #[error("Non-regular destination file '{}' ({kind})", path.display())]
    NonRegularDestination { path: PathBuf, kind: String },

    #[error("Failed to read '{}': {source}", path.display())]
    Read { path: PathBuf, source: io::Error },

    #[error("Failed to write '{}': {source}", path.display())]
    Write { path: PathBuf, source: io::Error },

    #[error("Failed to add archive entry '{name}': {source}")]
    Header {
        name: String,
        source: zip::result::ZipError,
    },

    #[error("Failed to walk '{}': {source}", path.display())]
    Walk {
        path: PathBuf,
        source: walkdir::Error,
    },

    #[error("Failed to sync '{}' to storage: {source}", path.display())]
    Sync { path: PathBuf, source: io::Error },

    #[error("Failed to close archive '{}': {source}", path.display())]
    ContainerClose {
        path: PathBuf,
        source: zip::result::ZipError,
    },
}

impl BackupError {
    pub fn class(&self) -> ErrorClass {
        match self {
            BackupError::SourceUnreachable { .. } | BackupError::ContainerCreate { .. } => {
                ErrorClass::Fatal
            }
            BackupError::Sync { .. } | BackupError::ContainerClose { .. } => {
                ErrorClass::Durability
            }
            _ => ErrorClass::PerEntry,
        }
    }

    pub fn is_fatal(&self) -> bool {
        self.class() == ErrorClass::Fatal
    }

    pub fn is_durability(&self) -> bool {
        self.class() == ErrorClass::Durability
    }

    /// The filesystem path the error concerns, when it has one.
    pub fn path(&self) -> Option<&std::path::Path> {
        match self {
            BackupError::SourceUnreachable { path, .. }
            | BackupError::ContainerCreate { path, .. }
            | BackupError::NonRegularSource { path, .. }
            | BackupError::NonRegularDestination { path, .. }
            | BackupError::Read { path, .. }
            | BackupError::Write { path, .. }
            | BackupError::Walk { path, .. }
            | BackupError::Sync { path, .. }
            | BackupError::ContainerClose { path, .. } => Some(path),
            BackupError::Header { .. } => None,
        }
    }
}

/// Describes a file type the way it shows up in error messages.
pub(crate) fn describe_file_type(file_type: std::fs::FileType) -> String {
    if file_type.is_dir() {
        return "directory".into();
    }
    if file_type.is_symlink() {
        return "symlink".into();
    }
    #[cfg(unix)]
    {
        use std::os::unix::fs::FileTypeExt;
        if file_type.is_fifo() {
            return "named pipe".into();
        }
        if file_type.is_socket() {
            return "socket".into();
        }
        if file_type.is_block_device() {
            return "block device".into();
        }
        if file_type.is_char_device() {
            return "character device".into();
        }
    }
    "unknown file type".into()
}
