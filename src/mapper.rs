//! Maps walked entries to where they land in the backup.

use crate::request::{BackupRequest, Mode};
use crate::walker::Entry;
use std::fmt;
use std::path::{Component, Path, PathBuf};

/// Where an entry was written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Destination {
    /// A path on disk (copy mode).
    Path(PathBuf),
    /// An entry name inside the archive (archive mode).
    Archive(String),
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Destination::Path(path) => write!(f, "{}", path.display()),
            Destination::Archive(name) => f.write_str(name),
        }
    }
}

/// Maps an entry according to the request's mode.
pub fn destination(entry: &Entry, request: &BackupRequest) -> Destination {
    match request.mode {
        Mode::Copy => Destination::Path(copy_path(entry, request)),
        Mode::Archive => Destination::Archive(archive_name(entry, request)),
    }
}

/// `copy_root / base_name / relative_path`.
pub fn copy_path(entry: &Entry, request: &BackupRequest) -> PathBuf {
    let nested = request.copy_root().join(request.base_name());
    if entry.relative_path.as_os_str().is_empty() {
        nested
    } else {
        nested.join(&entry.relative_path)
    }
}

/// `base_name/relative_path` with `/` separators; directories end in `/`.
pub fn archive_name(entry: &Entry, request: &BackupRequest) -> String {
    let mut name = request.base_name();
    for part in normal_components(&entry.relative_path) {
        name.push('/');
        name.push_str(&part);
    }
    if entry.is_directory() {
        name.push('/');
    }
    name
}

fn normal_components(path: &Path) -> impl Iterator<Item = String> + '_ {
    path.components().filter_map(|c| match c {
        Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
        _ => None,
    })
}
