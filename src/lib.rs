//! treebak: back up a directory tree as a mirrored copy or a single zip archive.
//!
//! The library walks the source tree, maps every entry to its place in the
//! backup, materializes it and tallies the outcome. The `tbk` binary is a thin
//! command-line layer over [`backup::run`].

pub mod backup;
pub mod config;
pub mod error;
pub mod mapper;
pub mod materialize;
pub mod outcome;
pub mod path_util;
pub mod report;
pub mod request;
pub mod sysexits;
pub mod walker;

pub use backup::{Backup, Event, run};
pub use error::{BackupError, ErrorClass};
pub use outcome::OutcomeCounters;
pub use request::{BackupRequest, Level, Mode};
