//! Exit code constants for the netlatch CLI.
//!
//! - 0: Success
//! - 1: User error (bad args, unreadable store, backend failure)
//! - 2: Configuration error (required setting missing or invalid)
//! - 3: Lock required (transaction boundary without an active lock)
//! - 4: Database busy (lock acquisition exhausted)

/// Successful execution.
pub const SUCCESS: i32 = 0;

/// User error: bad arguments, unreadable store, or a failed backend operation.
pub const USER_ERROR: i32 = 1;

/// Configuration error: required setting missing or invalid.
pub const CONFIG_ERROR: i32 = 2;

/// Lock required: commit/rollback attempted without an active lock.
pub const LOCK_REQUIRED: i32 = 3;

/// Database busy: lock acquisition exhausted its attempts or deadline.
pub const DATABASE_BUSY: i32 = 4;
