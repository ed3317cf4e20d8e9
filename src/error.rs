//! Error types for netlatch.
//!
//! Uses thiserror for derive macros. The variants are the only failure kinds
//! the crate surfaces: configuration errors, busy-database errors from lock
//! acquisition, lock-required errors from misordered transaction boundaries,
//! and pass-through errors from the underlying database backend.

use crate::exit_codes;
use thiserror::Error;

/// Errors produced by the underlying database backend or by closures run
/// inside a guarded scope.
pub type BackendError = Box<dyn std::error::Error + Send + Sync>;

/// Main error type for netlatch operations.
///
/// Each variant maps to a specific exit code for the CLI.
#[derive(Error, Debug)]
pub enum NetlatchError {
    /// A required setting is missing or invalid at construction time.
    #[error("configuration error: {0}")]
    Config(String),

    /// User provided invalid arguments or the store is in an invalid state.
    #[error("{0}")]
    UserError(String),

    /// Lock acquisition exhausted its attempt count or wall-clock deadline.
    #[error("database is busy: {0}")]
    DatabaseBusy(String),

    /// A transaction boundary was reached without an active lock.
    #[error("database lock is required: {0}")]
    LockRequired(String),

    /// The underlying database operation failed.
    #[error("backend operation failed: {0}")]
    Backend(#[source] BackendError),
}

impl NetlatchError {
    /// Returns the appropriate exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            NetlatchError::Config(_) => exit_codes::CONFIG_ERROR,
            NetlatchError::UserError(_) => exit_codes::USER_ERROR,
            NetlatchError::DatabaseBusy(_) => exit_codes::DATABASE_BUSY,
            NetlatchError::LockRequired(_) => exit_codes::LOCK_REQUIRED,
            NetlatchError::Backend(_) => exit_codes::USER_ERROR,
        }
    }
}

/// Result type alias for netlatch operations.
pub type Result<T> = std::result::Result<T, NetlatchError>;
