use super::copy::stream_copy;
use super::{Materialized, MaterializedKind, Materializer};
use crate::error::BackupError;
use crate::mapper::{self, Destination};
use crate::request::BackupRequest;
use crate::walker::{Entry, EntryKind};
use chrono::{Datelike, Local, Timelike};
use log::{debug, warn};
use std::fs::{self, File};
use std::io::{self, BufWriter, Read};
use std::path::PathBuf;
use std::time::SystemTime;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, DateTime, ZipWriter};

type ArchiveWriter = ZipWriter<BufWriter<File>>;

/// Writes every entry into a single deflate-compressed zip archive.
///
/// The archive is finalized exactly once, by [`Materializer::finish`] or, if
/// that never ran, when the materializer is dropped.
pub struct ArchiveMaterializer {
    request: BackupRequest,
    path: PathBuf,
    writer: Option<ArchiveWriter>,
}

impl ArchiveMaterializer {
    /// Creates the archive file at [`BackupRequest::archive_path`].
    ///
    /// # Errors
    /// Returns [`BackupError::ContainerCreate`] if the file cannot be created.
    pub fn create(request: BackupRequest) -> Result<Self, BackupError> {
        let path = request.archive_path();
        let container_err = |source| BackupError::ContainerCreate {
            path: path.clone(),
            source,
        };
        fs::create_dir_all(&request.dest_root).map_err(container_err)?;
        let file = File::create(&path).map_err(container_err)?;
        debug!("opened archive {}", path.display());
        Ok(Self {
            request,
            writer: Some(ZipWriter::new(BufWriter::new(file))),
            path,
        })
    }

    fn writer(&mut self) -> Result<&mut ArchiveWriter, BackupError> {
        let path = &self.path;
        self.writer.as_mut().ok_or_else(|| BackupError::Write {
            path: path.clone(),
            source: io::Error::other("archive is already closed"),
        })
    }

    fn base_options(entry: &Entry) -> SimpleFileOptions {
        SimpleFileOptions::default()
            .last_modified_time(zip_time(entry.modified))
            .unix_permissions(entry.mode)
    }

    fn add_file(&mut self, entry: &Entry, name: &str) -> Result<u64, BackupError> {
        // Open the source first so an unreadable file leaves no empty record behind.
        let mut reader = File::open(&entry.absolute_path).map_err(|source| BackupError::Read {
            path: entry.absolute_path.clone(),
            source,
        })?;
        self.append(&mut reader, entry, name)
    }

    /// Streams `reader` into a new record named `name`.
    ///
    /// A record whose content could not be copied in full is removed again.
    fn append<R: Read>(
        &mut self,
        reader: &mut R,
        entry: &Entry,
        name: &str,
    ) -> Result<u64, BackupError> {
        let options = Self::base_options(entry)
            .compression_method(CompressionMethod::Deflated)
            .compression_level(Some(self.request.level.deflate_level()))
            .large_file(entry.size_bytes >= u64::from(u32::MAX));
        let archive_path = self.path.clone();
        let writer = self.writer()?;
        writer
            .start_file(name, options)
            .map_err(|source| BackupError::Header {
                name: name.to_string(),
                source,
            })?;
        match stream_copy(reader, &entry.absolute_path, writer, &archive_path) {
            Ok(bytes) => Ok(bytes),
            Err(err) => {
                if let Err(abort_err) = writer.abort_file() {
                    warn!("could not drop partial record '{name}': {abort_err}");
                }
                Err(err)
            }
        }
    }

    fn close(&mut self) -> Result<(), BackupError> {
        let Some(writer) = self.writer.take() else {
            return Ok(());
        };
        let buffered = writer
            .finish()
            .map_err(|source| BackupError::ContainerClose {
                path: self.path.clone(),
                source,
            })?;
        let file = buffered
            .into_inner()
            .map_err(|e| BackupError::Sync {
                path: self.path.clone(),
                source: e.into_error(),
            })?;
        file.sync_all().map_err(|source| BackupError::Sync {
            path: self.path.clone(),
            source,
        })?;
        debug!("closed archive {}", self.path.display());
        Ok(())
    }
}

impl Materializer for ArchiveMaterializer {
    fn materialize(&mut self, entry: &Entry) -> Result<Materialized, BackupError> {
        let name = mapper::archive_name(entry, &self.request);
        let kind = match &entry.kind {
            EntryKind::Directory => {
                let options = Self::base_options(entry);
                self.writer()?
                    .add_directory(name.as_str(), options)
                    .map_err(|source| BackupError::Header {
                        name: name.clone(),
                        source,
                    })?;
                MaterializedKind::Directory
            }
            EntryKind::File => MaterializedKind::Written {
                bytes: self.add_file(entry, &name)?,
            },
            EntryKind::Other(kind) => {
                return Err(BackupError::NonRegularSource {
                    path: entry.absolute_path.clone(),
                    kind: kind.clone(),
                });
            }
        };
        Ok(Materialized {
            destination: Destination::Archive(name),
            kind,
        })
    }

    fn finish(&mut self) -> Result<(), BackupError> {
        self.close()
    }
}

impl Drop for ArchiveMaterializer {
    fn drop(&mut self) {
        if self.writer.is_some() {
            warn!("archive {} was not finished, closing it now", self.path.display());
            if let Err(e) = self.close() {
                warn!("{e}");
            }
        }
    }
}

/// Converts a modification time to the zip format's local timestamp.
///
/// Times the format cannot represent fall back to its epoch (1980-01-01).
fn zip_time(modified: Option<SystemTime>) -> DateTime {
    modified
        .and_then(|time| {
            let local = chrono::DateTime::<Local>::from(time).naive_local();
            DateTime::from_date_and_time(
                u16::try_from(local.year()).ok()?,
                local.month() as u8,
                local.day() as u8,
                local.hour() as u8,
                local.minute() as u8,
                local.second() as u8,
            )
            .ok()
        })
        .unwrap_or_default()
}
