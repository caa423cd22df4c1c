//! Standard exit codes for CLI operations
//!
//! These exit codes follow Unix conventions and sysexits.h where applicable.

/// General error - unspecified failure
pub const ERROR: i32 = 1;

/// Validation error - bad document, import id, setting or configuration
pub const VALIDATION_ERROR: i32 = 2;

/// The object does not exist
pub const NOT_FOUND: i32 = 3;

/// A wait ran out of time
pub const TIMEOUT: i32 = 4;

/// IO error - file not found, permission denied, etc.
pub const IO_ERROR: i32 = 5;

/// Server-side apply conflict with another field manager
pub const CONFLICT: i32 = 6;

/// Interrupted by Ctrl-C (128 + SIGINT)
pub const CANCELLED: i32 = 130;
