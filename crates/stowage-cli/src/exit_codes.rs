//! Standard exit codes for CLI operations
//!
//! These exit codes follow Unix conventions and sysexits.h where applicable.

/// Success - operation completed without errors
pub const SUCCESS: i32 = 0;

/// General error - API server or release storage failure
pub const ERROR: i32 = 1;

/// Configuration error - release values or settings are invalid
pub const CONFIGURATION_ERROR: i32 = 2;

/// Submission error - the custom resource was rejected
pub const SUBMISSION_ERROR: i32 = 3;

/// Timeout - no terminal phase within poll.maxWait
pub const TIMEOUT: i32 = 4;

/// IO error - file not found, permission denied, etc.
pub const IO_ERROR: i32 = 5;

/// Operation failed - the controller reported Failed, PartiallyFailed or FailedValidation
pub const OPERATION_FAILED: i32 = 6;

/// Reconcile error - the operation succeeded but the release update did not
pub const RECONCILE_ERROR: i32 = 7;

/// Cancelled - interrupted with Ctrl-C (128 + SIGINT)
pub const CANCELLED: i32 = 130;
