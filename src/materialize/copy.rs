use super::{Materialized, MaterializedKind, Materializer};
use crate::error::{BackupError, describe_file_type};
use crate::mapper::{self, Destination};
use crate::request::BackupRequest;
use crate::walker::{Entry, EntryKind};
use log::debug;
use std::fs::{self, File, Metadata};
use std::io::{self, Read, Write};
use std::path::Path;

const COPY_BUFFER_SIZE: usize = 128 * 1024;

/// Mirrors the source tree as plain directories and files.
pub struct DirectoryMaterializer {
    request: BackupRequest,
}

impl DirectoryMaterializer {
    /// Prepares the folder the backup is placed in.
    ///
    /// # Errors
    /// Returns [`BackupError::ContainerCreate`] if the folder cannot be created.
    pub fn new(request: BackupRequest) -> Result<Self, BackupError> {
        let root = request.copy_root();
        fs::create_dir_all(&root)
            .map_err(|source| BackupError::ContainerCreate { path: root, source })?;
        Ok(Self { request })
    }
}

impl Materializer for DirectoryMaterializer {
    fn materialize(&mut self, entry: &Entry) -> Result<Materialized, BackupError> {
        let dest = mapper::copy_path(entry, &self.request);
        let kind = match &entry.kind {
            EntryKind::Directory => {
                fs::create_dir_all(&dest).map_err(|source| BackupError::Write {
                    path: dest.clone(),
                    source,
                })?;
                MaterializedKind::Directory
            }
            EntryKind::File => copy_file(&entry.absolute_path, &dest)?,
            EntryKind::Other(kind) => {
                return Err(BackupError::NonRegularSource {
                    path: entry.absolute_path.clone(),
                    kind: kind.clone(),
                });
            }
        };
        Ok(Materialized {
            destination: Destination::Path(dest),
            kind,
        })
    }

    fn finish(&mut self) -> Result<(), BackupError> {
        Ok(())
    }
}

/// Copies one regular file, creating missing parent directories.
///
/// The destination is overwritten and synced to storage before it is closed.
/// Copying a file onto itself is a no-op reported as [`MaterializedKind::Unchanged`].
///
/// # Errors
/// * [`BackupError::NonRegularSource`] if `src` is not a regular file.
/// * [`BackupError::NonRegularDestination`] if `dest` exists and is not a regular file.
/// * [`BackupError::Read`] / [`BackupError::Write`] on I/O failure.
/// * [`BackupError::Sync`] if the written file cannot be flushed to storage.
pub fn copy_file(src: &Path, dest: &Path) -> Result<MaterializedKind, BackupError> {
    let src_meta = fs::metadata(src).map_err(|source| BackupError::Read {
        path: src.to_path_buf(),
        source,
    })?;
    if !src_meta.is_file() {
        return Err(BackupError::NonRegularSource {
            path: src.to_path_buf(),
            kind: describe_file_type(src_meta.file_type()),
        });
    }

    match fs::metadata(dest) {
        Ok(dest_meta) => {
            if !dest_meta.is_file() {
                return Err(BackupError::NonRegularDestination {
                    path: dest.to_path_buf(),
                    kind: describe_file_type(dest_meta.file_type()),
                });
            }
            if same_file(src, &src_meta, dest, &dest_meta) {
                debug!("{} is already in place", dest.display());
                return Ok(MaterializedKind::Unchanged {
                    bytes: src_meta.len(),
                });
            }
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(source) => {
            return Err(BackupError::Write {
                path: dest.to_path_buf(),
                source,
            });
        }
    }

    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent).map_err(|source| BackupError::Write {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    let mut reader = File::open(src).map_err(|source| BackupError::Read {
        path: src.to_path_buf(),
        source,
    })?;
    let mut writer = File::create(dest).map_err(|source| BackupError::Write {
        path: dest.to_path_buf(),
        source,
    })?;
    let bytes = stream_copy(&mut reader, src, &mut writer, dest)?;

    writer.sync_all().map_err(|source| BackupError::Sync {
        path: dest.to_path_buf(),
        source,
    })?;
    debug!("copied {} -> {} ({bytes} bytes)", src.display(), dest.display());
    Ok(MaterializedKind::Written { bytes })
}

/// Streams `reader` into `writer`, attributing failures to the side that failed.
pub(crate) fn stream_copy<R: Read, W: Write>(
    reader: &mut R,
    src: &Path,
    writer: &mut W,
    dest: &Path,
) -> Result<u64, BackupError> {
    let mut buffer = vec![0u8; COPY_BUFFER_SIZE];
    let mut total = 0u64;
    loop {
        let n = match reader.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(source) => {
                return Err(BackupError::Read {
                    path: src.to_path_buf(),
                    source,
                });
            }
        };
        writer
            .write_all(&buffer[..n])
            .map_err(|source| BackupError::Write {
                path: dest.to_path_buf(),
                source,
            })?;
        total += n as u64;
    }
    writer.flush().map_err(|source| BackupError::Write {
        path: dest.to_path_buf(),
        source,
    })?;
    Ok(total)
}

#[cfg(unix)]
fn same_file(_src: &Path, src_meta: &Metadata, _dest: &Path, dest_meta: &Metadata) -> bool {
    use std::os::unix::fs::MetadataExt;
    src_meta.dev() == dest_meta.dev() && src_meta.ino() == dest_meta.ino()
}

#[cfg(not(unix))]
fn same_file(src: &Path, _src_meta: &Metadata, dest: &Path, _dest_meta: &Metadata) -> bool {
    match (fs::canonicalize(src), fs::canonicalize(dest)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}
