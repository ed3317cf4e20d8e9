//! Remote lock store abstraction.
//!
//! A lock store holds at most one [`LockRecord`] per resource key and offers
//! exactly two operations, both of which must execute their condition check
//! and mutation atomically:
//!
//! - [`conditional_put`]: write a record only if none exists for the key, or
//!   the existing record has already expired. This is the sole serialization
//!   point of the whole design.
//! - [`conditional_delete`]: remove a record only if its `lock_id` matches
//!   the expected owner token, so a slow release can never delete a lock
//!   that was stolen after expiry.
//!
//! Condition failures are distinguishable from transient faults (network,
//! throttling, I/O) so callers can log them differently; both drive the same
//! retry path during acquisition.
//!
//! [`conditional_put`]: LockStore::conditional_put
//! [`conditional_delete`]: LockStore::conditional_delete

mod file;
mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

/// Errors from lock store operations.
#[derive(Error, Debug)]
pub enum StoreError {
    /// The conditional check did not pass: the record is held by another
    /// owner, or the expected owner token did not match.
    #[error("lock record condition not met")]
    ConditionFailed,

    /// The store could not be reached or the operation faulted.
    #[error("lock store unavailable: {0}")]
    Unavailable(String),
}

/// Result type alias for lock store operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// A persisted lock record, one per protected resource.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LockRecord {
    /// Resource key the record belongs to (e.g. `database#/srv/app.db`).
    pub key: String,

    /// Opaque ownership token, freshly generated per acquisition attempt.
    pub lock_id: String,

    /// Owner of the lock (e.g. `user@HOST`). Diagnostic only.
    pub owner: String,

    /// Process ID of the lock holder (optional). Diagnostic only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pid: Option<u32>,

    /// When the acquisition attempt was made (RFC3339).
    pub acquired_at: DateTime<Utc>,

    /// Absolute expiry; past this instant the record is stale and may be
    /// overwritten by another acquirer.
    pub expires_at: DateTime<Utc>,
}

impl LockRecord {
    /// Create a record for an acquisition attempt at `acquired_at`.
    pub fn new(
        key: impl Into<String>,
        lock_id: impl Into<String>,
        acquired_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Self {
        Self {
            key: key.into(),
            lock_id: lock_id.into(),
            owner: owner_string(),
            pid: Some(std::process::id()),
            acquired_at,
            expires_at,
        }
    }

    /// Whether the record is stale as of `now` and eligible to be stolen.
    pub fn is_stale(&self, now: DateTime<Utc>) -> bool {
        self.expires_at < now
    }
}

/// Remote store holding lock records, keyed by resource.
///
/// Implementations must execute each operation's condition check and
/// mutation atomically with respect to all other clients of the store.
pub trait LockStore {
    /// Write `record` under `key` iff no record exists for `key` or the
    /// existing record's `expires_at` is before `now`.
    ///
    /// Fails with [`StoreError::ConditionFailed`] when an unexpired record
    /// is present; never overwrites one.
    fn conditional_put(&self, key: &str, record: &LockRecord, now: DateTime<Utc>)
    -> StoreResult<()>;

    /// Delete the record under `key` iff its `lock_id` equals
    /// `expected_lock_id`.
    ///
    /// Fails with [`StoreError::ConditionFailed`] when the record is absent
    /// or owned by someone else; never deletes on a mismatch.
    fn conditional_delete(&self, key: &str, expected_lock_id: &str) -> StoreResult<()>;
}

impl<S: LockStore + ?Sized> LockStore for &S {
    fn conditional_put(
        &self,
        key: &str,
        record: &LockRecord,
        now: DateTime<Utc>,
    ) -> StoreResult<()> {
        (**self).conditional_put(key, record, now)
    }

    fn conditional_delete(&self, key: &str, expected_lock_id: &str) -> StoreResult<()> {
        (**self).conditional_delete(key, expected_lock_id)
    }
}

impl<S: LockStore + ?Sized> LockStore for Arc<S> {
    fn conditional_put(
        &self,
        key: &str,
        record: &LockRecord,
        now: DateTime<Utc>,
    ) -> StoreResult<()> {
        (**self).conditional_put(key, record, now)
    }

    fn conditional_delete(&self, key: &str, expected_lock_id: &str) -> StoreResult<()> {
        (**self).conditional_delete(key, expected_lock_id)
    }
}

/// Get the owner string for lock records.
pub(crate) fn owner_string() -> String {
    let user = std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .unwrap_or_else(|_| "unknown".to_string());

    let host = hostname::get()
        .map(|h| h.to_string_lossy().to_string())
        .unwrap_or_else(|_| "unknown".to_string());

    format!("{}@{}", user, host)
}
