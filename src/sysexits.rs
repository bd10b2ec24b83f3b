//! Exit status codes of the `tbk` binary.

/// value: 0 <br>
/// The backup ran to completion. Per-entry errors may still have been counted.
pub const EX_OK: i32 = 0;

/// value: 1 <br>
/// The command was used incorrectly: missing or invalid arguments, a source
/// path that does not exist, or an unreadable config file.
pub const EX_USAGE: i32 = 1;

/// value: 3 <br>
/// The backup itself failed: the source or the destination container could
/// not be opened, or the result could not be flushed to storage.
pub const EX_FATAL: i32 = 3;
