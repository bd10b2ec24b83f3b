//! Lazy, depth-first, pre-order traversal of a source tree.
//!
//! Entries within a directory come out sorted by file name, directories
//! before their children. Only the open directory handles along the current
//! path are held, never the whole tree.

use crate::error::{BackupError, describe_file_type};
use log::{debug, trace};
use std::fs::{self, Metadata};
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use walkdir::WalkDir;

/// What a walked path turned out to be once symlinks are resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryKind {
    Directory,
    File,
    /// Anything else: device node, named pipe, socket. Carries a description.
    Other(String),
}

/// One filesystem object met during the walk.
#[derive(Debug, Clone)]
pub struct Entry {
    pub absolute_path: PathBuf,
    /// Path relative to the source root; empty for the root itself.
    pub relative_path: PathBuf,
    pub kind: EntryKind,
    pub size_bytes: u64,
    pub modified: Option<SystemTime>,
    /// Permission bits (`0o7777` mask).
    pub mode: u32,
}

impl Entry {
    pub fn is_directory(&self) -> bool {
        self.kind == EntryKind::Directory
    }

    pub fn is_file(&self) -> bool {
        self.kind == EntryKind::File
    }

    fn from_metadata(absolute_path: PathBuf, relative_path: PathBuf, meta: &Metadata) -> Self {
        let file_type = meta.file_type();
        let kind = if file_type.is_dir() {
            EntryKind::Directory
        } else if file_type.is_file() {
            EntryKind::File
        } else {
            EntryKind::Other(describe_file_type(file_type))
        };
        let size_bytes = if kind == EntryKind::Directory {
            0
        } else {
            meta.len()
        };
        Entry {
            absolute_path,
            relative_path,
            size_bytes,
            modified: meta.modified().ok(),
            mode: permission_bits(meta, &kind),
            kind,
        }
    }
}

#[cfg(unix)]
fn permission_bits(meta: &Metadata, _kind: &EntryKind) -> u32 {
    use std::os::unix::fs::PermissionsExt;
    meta.permissions().mode() & 0o7777
}

#[cfg(not(unix))]
fn permission_bits(meta: &Metadata, kind: &EntryKind) -> u32 {
    let base = if *kind == EntryKind::Directory { 0o755 } else { 0o644 };
    if meta.permissions().readonly() {
        base & !0o222
    } else {
        base
    }
}

/// Iterator over every entry under a source root, the root included.
///
/// Not restartable; build a new walker to walk again.
pub struct Walker {
    root: PathBuf,
    ignore: Vec<PathBuf>,
    inner: walkdir::IntoIter,
}

impl Walker {
    /// Opens a walk of `root`.
    ///
    /// # Errors
    /// Returns [`BackupError::SourceUnreachable`] if the root cannot be stat'ed.
    pub fn new(root: &Path) -> Result<Self, BackupError> {
        fs::metadata(root).map_err(|source| BackupError::SourceUnreachable {
            path: root.to_path_buf(),
            source,
        })?;
        let inner = WalkDir::new(root)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter();
        Ok(Walker {
            root: root.to_path_buf(),
            ignore: vec![],
            inner,
        })
    }

    /// Prunes the given absolute paths, and everything below them, from the walk.
    pub fn ignoring(mut self, paths: Vec<PathBuf>) -> Self {
        self.ignore = paths;
        self
    }

    fn is_ignored(&self, path: &Path) -> bool {
        self.ignore.iter().any(|p| path.starts_with(p))
    }

    fn to_entry(&self, dir_entry: walkdir::DirEntry) -> Result<Entry, BackupError> {
        let path = dir_entry.path().to_path_buf();
        let relative = path
            .strip_prefix(&self.root)
            .map(Path::to_path_buf)
            .unwrap_or_default();
        let meta = if dir_entry.path_is_symlink() {
            // Links are not followed by the walk; resolve them for the entry itself.
            fs::metadata(&path)
        } else {
            dir_entry.metadata().map_err(io::Error::from)
        };
        let meta = meta.map_err(|source| BackupError::Read {
            path: path.clone(),
            source,
        })?;
        Ok(Entry::from_metadata(path, relative, &meta))
    }
}

impl Iterator for Walker {
    type Item = Result<Entry, BackupError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let next = self.inner.next()?;
            let dir_entry = match next {
                Ok(dir_entry) => dir_entry,
                Err(err) if err.depth() == 0 => {
                    return Some(Err(BackupError::SourceUnreachable {
                        path: self.root.clone(),
                        source: io::Error::from(err),
                    }));
                }
                Err(err) => {
                    let path = err.path().unwrap_or(&self.root).to_path_buf();
                    debug!("walk error at {}: {err}", path.display());
                    return Some(Err(BackupError::Walk { path, source: err }));
                }
            };
            if self.is_ignored(dir_entry.path()) {
                trace!("ignoring {}", dir_entry.path().display());
                if dir_entry.file_type().is_dir() {
                    self.inner.skip_current_dir();
                }
                continue;
            }
            return Some(self.to_entry(dir_entry));
        }
    }
}
