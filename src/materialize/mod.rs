//! Turning walked entries into persisted backup records.
//!
//! A [`Materializer`] is chosen once per run from the request's [`Mode`] and
//! then fed every entry in traversal order.

mod archive;
mod copy;

pub use archive::ArchiveMaterializer;
pub use copy::{DirectoryMaterializer, copy_file};

use crate::error::BackupError;
use crate::mapper::Destination;
use crate::request::{BackupRequest, Mode};
use crate::walker::Entry;

/// What happened to an entry that was materialized without error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaterializedKind {
    /// A directory was created or recorded.
    Directory,
    /// File content was written.
    Written { bytes: u64 },
    /// Source and destination are the same file; nothing was written.
    Unchanged { bytes: u64 },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Materialized {
    pub destination: Destination,
    pub kind: MaterializedKind,
}

impl Materialized {
    /// Bytes attributed to this entry; `None` for directories.
    pub fn file_bytes(&self) -> Option<u64> {
        match self.kind {
            MaterializedKind::Directory => None,
            MaterializedKind::Written { bytes } | MaterializedKind::Unchanged { bytes } => {
                Some(bytes)
            }
        }
    }
}

pub trait Materializer {
    /// Persists a single entry.
    fn materialize(&mut self, entry: &Entry) -> Result<Materialized, BackupError>;

    /// Flushes and releases whatever the materializer holds open.
    ///
    /// Calling it more than once is a no-op.
    fn finish(&mut self) -> Result<(), BackupError>;
}

/// Builds the materializer for the request's mode.
///
/// # Errors
/// Fails with a fatal error if the destination container cannot be created.
pub fn select(request: &BackupRequest) -> Result<Box<dyn Materializer>, BackupError> {
    Ok(match request.mode {
        Mode::Copy => Box::new(DirectoryMaterializer::new(request.clone())?),
        Mode::Archive => Box::new(ArchiveMaterializer::create(request.clone())?),
    })
}
