//! Console lines for a run: one per file entry, then a summary.

use crate::backup::Event;
use crate::materialize::MaterializedKind;
use crate::outcome::OutcomeCounters;
use crate::request::Mode;
use console::{Style, style};
use std::path::Path;

/// Formats a byte count, rounding down in steps of 1024.
///
/// `1500` becomes `"1KB"`.
pub fn file_size(size: u64) -> String {
    const KB: u64 = 1024;
    if size < KB {
        format!("{size}B")
    } else if size / KB < KB {
        format!("{}KB", size / KB)
    } else if size / KB / KB < KB {
        format!("{}MB", size / KB / KB)
    } else {
        format!("{}GB", size / KB / KB / KB)
    }
}

fn size_style(size: u64) -> Style {
    let formatted = file_size(size);
    if formatted.ends_with("GB") {
        Style::new().magenta()
    } else if formatted.ends_with("MB") {
        Style::new().red()
    } else if formatted.ends_with("KB") {
        Style::new().yellow()
    } else {
        Style::new().green()
    }
}

fn declare(mode: Mode, path: &Path, size: u64) -> String {
    let verb = match mode {
        Mode::Copy => "Copying:",
        Mode::Archive => "Zipping:",
    };
    format!(
        "{verb} {} {} -> ",
        path.display(),
        size_style(size).apply_to(format!("[{}]", file_size(size)))
    )
}

/// The console line for an event, if it warrants one.
///
/// Directories that were created without trouble are not reported.
pub fn entry_line(event: &Event<'_>, mode: Mode) -> Option<String> {
    match event {
        Event::Materialized {
            entry,
            materialized,
        } => {
            let done = match (materialized.kind, mode) {
                (MaterializedKind::Directory, _) => return None,
                (MaterializedKind::Unchanged { .. }, _) => "File unchanged",
                (MaterializedKind::Written { .. }, Mode::Copy) => "File copied",
                (MaterializedKind::Written { .. }, Mode::Archive) => "File archived",
            };
            Some(format!(
                "{}{}",
                declare(mode, &entry.absolute_path, entry.size_bytes),
                style(done).green()
            ))
        }
        Event::Failed {
            path,
            size,
            is_file,
            error,
        } => {
            let message = style(format!("Error: {error}")).red();
            if *is_file {
                Some(format!("{}{message}", declare(mode, path, *size)))
            } else {
                Some(message.to_string())
            }
        }
    }
}

/// The closing report: where the backup went and what it amounted to.
pub fn summary(location: &Path, counters: &OutcomeCounters) -> String {
    format!(
        "Backup complete.\nSaved to {}\nProcessed {} files ({} total)\nEncountered {} errors",
        location.display(),
        counters.files_processed,
        file_size(counters.bytes_processed),
        counters.error_count
    )
}
