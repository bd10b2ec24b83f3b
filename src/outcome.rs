use crate::error::BackupError;
use log::warn;

/// Aggregate counters reported at the end of a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OutcomeCounters {
    pub files_processed: u64,
    pub bytes_processed: u64,
    pub error_count: u64,
}

/// Accumulates per-entry outcomes for one run.
///
/// Called once per entry, in entry order; never reset mid-run.
#[derive(Debug, Default)]
pub struct Outcome {
    counters: OutcomeCounters,
}

impl Outcome {
    pub fn new() -> Self {
        Self::default()
    }

    /// A file entry made it into the backup (same-file copies included).
    pub fn record_success(&mut self, size_bytes: u64) {
        self.counters.files_processed += 1;
        self.counters.bytes_processed += size_bytes;
    }

    /// An entry failed; the walk goes on.
    ///
    /// `file_size` is `Some` when the entry is a regular file, which still
    /// counts as processed.
    pub fn record_failure(&mut self, err: &BackupError, file_size: Option<u64>) {
        warn!("{err}");
        if let Some(size_bytes) = file_size {
            self.counters.files_processed += 1;
            self.counters.bytes_processed += size_bytes;
        }
        self.counters.error_count += 1;
    }

    pub fn summary(&self) -> OutcomeCounters {
        self.counters
    }
}
