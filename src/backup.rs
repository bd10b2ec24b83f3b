//! Runs a backup: walks the source, materializes each entry, tallies the outcome.

use crate::error::BackupError;
use crate::materialize::{self, Materialized, Materializer};
use crate::outcome::{Outcome, OutcomeCounters};
use crate::request::{BackupRequest, Mode};
use crate::walker::{Entry, Walker};
use log::{debug, info, warn};
use std::path::{Path, PathBuf};

/// One per walked entry, emitted in traversal order.
#[derive(Debug)]
pub enum Event<'a> {
    Materialized {
        entry: &'a Entry,
        materialized: &'a Materialized,
    },
    Failed {
        path: &'a Path,
        /// Size of the entry, 0 when it could not be determined.
        size: u64,
        /// Whether the failed entry is known to be a regular file.
        is_file: bool,
        error: &'a BackupError,
    },
}

/// Run context: the request plus the counters it accumulates.
pub struct Backup {
    request: BackupRequest,
    outcome: Outcome,
}

impl Backup {
    pub fn new(request: BackupRequest) -> Self {
        Self {
            request,
            outcome: Outcome::new(),
        }
    }

    /// Counters so far; still readable after a durability error.
    pub fn summary(&self) -> OutcomeCounters {
        self.outcome.summary()
    }

    /// Absolute paths the walk must skip.
    ///
    /// A backup placed inside its own source would otherwise be walked into.
    fn pruned_paths(&self) -> Vec<PathBuf> {
        let root = &self.request.source_root;
        let mut paths: Vec<PathBuf> = self.request.ignore.iter().map(|p| root.join(p)).collect();
        let inside = |p: &Path| p.starts_with(root) && p != root.as_path();
        let location = match self.request.mode {
            Mode::Copy if inside(self.request.copy_root().as_path()) => self.request.copy_root(),
            _ => self.request.backup_location(),
        };
        if inside(location.as_path()) {
            debug!("backup location {} is inside the source", location.display());
            paths.push(location);
        }
        paths
    }

    /// Executes the run, reporting every entry to `on_event`.
    ///
    /// Per-entry failures are counted and the walk continues. Fatal errors end
    /// the run at once. A durability failure is returned once the walk is done.
    pub fn execute<F>(&mut self, on_event: F) -> Result<OutcomeCounters, BackupError>
    where
        F: FnMut(Event<'_>),
    {
        info!(
            "backing up {} to {} ({:?} mode)",
            self.request.source_root.display(),
            self.request.backup_location().display(),
            self.request.mode
        );
        let walker = Walker::new(&self.request.source_root)?.ignoring(self.pruned_paths());
        let materializer = materialize::select(&self.request)?;
        self.drive(walker, materializer, on_event)
    }

    /// Feeds every walked entry through `materializer`, then closes it.
    fn drive<F>(
        &mut self,
        walker: Walker,
        mut materializer: Box<dyn Materializer>,
        mut on_event: F,
    ) -> Result<OutcomeCounters, BackupError>
    where
        F: FnMut(Event<'_>),
    {
        let mut durability: Option<BackupError> = None;

        for next in walker {
            let entry = match next {
                Ok(entry) => entry,
                Err(err) if err.is_fatal() => {
                    if let Err(close_err) = materializer.finish() {
                        warn!("{close_err}");
                    }
                    return Err(err);
                }
                Err(err) => {
                    self.outcome.record_failure(&err, None);
                    on_event(Event::Failed {
                        path: err.path().unwrap_or(self.request.source_root.as_path()),
                        size: 0,
                        is_file: false,
                        error: &err,
                    });
                    continue;
                }
            };

            match materializer.materialize(&entry) {
                Ok(materialized) => {
                    if let Some(bytes) = materialized.file_bytes() {
                        self.outcome.record_success(bytes);
                    }
                    on_event(Event::Materialized {
                        entry: &entry,
                        materialized: &materialized,
                    });
                }
                Err(err) => {
                    let file_size = entry.is_file().then_some(entry.size_bytes);
                    self.outcome.record_failure(&err, file_size);
                    on_event(Event::Failed {
                        path: &entry.absolute_path,
                        size: entry.size_bytes,
                        is_file: entry.is_file(),
                        error: &err,
                    });
                    if err.is_durability() && durability.is_none() {
                        durability = Some(err);
                    }
                }
            }
        }

        materializer.finish()?;
        let summary = self.summary();
        info!(
            "processed {} files ({} bytes), {} errors",
            summary.files_processed, summary.bytes_processed, summary.error_count
        );
        match durability {
            Some(err) => Err(err),
            None => Ok(summary),
        }
    }
}

/// Runs `request` to completion; see [`Backup::execute`].
pub fn run<F>(request: BackupRequest, on_event: F) -> Result<OutcomeCounters, BackupError>
where
    F: FnMut(Event<'_>),
{
    Backup::new(request).execute(on_event)
}
