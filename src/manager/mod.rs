//! Distributed lock manager for a single protected database.
//!
//! One `LockManager` instance guards one file-backed database for one
//! connection's lifetime. It decides which operations need the distributed
//! lock, acquires it with bounded retry and backoff through the remote
//! store's conditional writes, and releases it (or deliberately retains it
//! across a transaction) when the guarded scope exits.
//!
//! # Lock protocol
//!
//! - Acquisition writes a fresh lock record (new UUID, absolute expiry) via
//!   [`LockStore::conditional_put`]; the store's atomic condition check is
//!   the sole serialization point between competing processes.
//! - A crashed holder never blocks others forever: its record goes stale at
//!   `expires_at` and the next acquirer steals it.
//! - Release is best-effort. A failed conditional delete is logged and
//!   forgotten; expiry guarantees eventual release.
//!
//! # Consistency trade-off
//!
//! Read statements proceed without the lock, so a writer on another machine
//! can interleave with a local read. This is acceptable only because the
//! protected database's read path is assumed consistent once a write has
//! been committed and its lock released.


use crate::clock::{Clock, SystemClock};
use crate::config::LockConfig;
use crate::error::{BackendError, NetlatchError, Result};
use crate::sql::{self, StatementKind};
use crate::store::{LockRecord, LockStore, StoreError};
use chrono::{DateTime, Duration, Utc};
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Base backoff delay between acquisition attempts, in milliseconds.
/// Attempt `n` sleeps `n * BACKOFF_BASE_MS`.
const BACKOFF_BASE_MS: u64 = 50;

/// Lock manager for one protected database.
///
/// Owned by the session/connection it protects; never shared or static, so
/// multiple protected resources and parallel test instances cannot
/// interfere.
#[derive(Debug)]
pub struct LockManager<S, C = SystemClock> {
    config: LockConfig,
    store: S,
    clock: C,
    database_path: PathBuf,
    resource_key: String,
    current_lock_id: Option<String>,
    acquired_at: Option<DateTime<Utc>>,
    expires_at: Option<DateTime<Utc>>,
    in_transaction: bool,
    pending_statement: Option<String>,
}

impl<S: LockStore> LockManager<S> {
    /// Create a manager over `store` for the database at `database_path`.
    ///
    /// Fails with a configuration error when `config` is missing required
    /// settings.
    pub fn new(store: S, config: LockConfig, database_path: impl Into<PathBuf>) -> Result<Self> {
        Self::with_clock(store, SystemClock, config, database_path)
    }
}

impl<S: LockStore, C: Clock> LockManager<S, C> {
    /// Create a manager with an explicit clock.
    pub fn with_clock(
        store: S,
        clock: C,
        config: LockConfig,
        database_path: impl Into<PathBuf>,
    ) -> Result<Self> {
        config.validate()?;
        let database_path = database_path.into();
        let resource_key = format!("database#{}", database_path.display());

        Ok(Self {
            config,
            store,
            clock,
            database_path,
            resource_key,
            current_lock_id: None,
            acquired_at: None,
            expires_at: None,
            in_transaction: false,
            pending_statement: None,
        })
    }

    /// The key under which this database's lock record is stored.
    pub fn resource_key(&self) -> &str {
        &self.resource_key
    }

    /// Path of the protected database file.
    pub fn database_path(&self) -> &Path {
        &self.database_path
    }

    /// The manager's configuration.
    pub fn config(&self) -> &LockConfig {
        &self.config
    }

    /// Whether a transaction is currently open.
    pub fn in_transaction(&self) -> bool {
        self.in_transaction
    }

    /// Ownership token of the currently held lock, if any.
    pub fn current_lock_id(&self) -> Option<&str> {
        self.current_lock_id.as_deref()
    }

    /// Expiry of the currently held lock, if any.
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at
    }

    /// Normalized text of the statement currently inside a guarded scope.
    pub fn pending_statement(&self) -> Option<&str> {
        self.pending_statement.as_deref()
    }

    /// Whether this instance holds a non-expired lock.
    pub fn is_lock_active(&self) -> bool {
        self.current_lock_id.is_some() && !self.is_lock_expired()
    }

    /// Whether the locally held lock has expired (or none is held).
    fn is_lock_expired(&self) -> bool {
        match self.expires_at {
            Some(expires_at) => expires_at <= self.clock.now(),
            None => true,
        }
    }

    /// Whether a crash-recovery marker exists for the protected database.
    ///
    /// The database engine leaves a rollback journal next to the database
    /// file while a transaction is in flight; its presence after a crash
    /// means recovery work is pending and the lock must be held before the
    /// database is touched.
    pub fn recovery_marker_exists(&self) -> bool {
        self.recovery_marker_path().exists()
    }

    /// Path of the crash-recovery marker for the protected database.
    pub fn recovery_marker_path(&self) -> PathBuf {
        let mut name = self.database_path.as_os_str().to_os_string();
        name.push("-journal");
        PathBuf::from(name)
    }

    /// Acquire the distributed lock for the protected database.
    ///
    /// Returns immediately when this instance already holds a non-expired
    /// lock. Otherwise retries the conditional put with linear backoff until
    /// it succeeds, the attempt budget is spent, or the wall-clock deadline
    /// passes; exhaustion fails with a database-busy error and leaves the
    /// manager unlocked.
    pub fn acquire(&mut self) -> Result<()> {
        if self.is_lock_active() {
            return Ok(());
        }

        let mut attempt_count: u32 = 0;
        let deadline = self.clock.now()
            + Duration::seconds(self.config.effective_wait_timeout_secs() as i64);

        while self.clock.now() < deadline && attempt_count < self.config.max_attempts {
            let lock_id = Uuid::new_v4().to_string();
            let now = self.clock.now();
            let expires_at = now + Duration::seconds(self.config.expiration_secs as i64);
            let record = LockRecord::new(&self.resource_key, &lock_id, now, expires_at);

            match self.store.conditional_put(&self.resource_key, &record, now) {
                Ok(()) => {
                    info!(
                        key = %self.resource_key,
                        lock_id = %lock_id,
                        expires_at = %expires_at,
                        "lock acquired"
                    );
                    self.current_lock_id = Some(lock_id);
                    self.acquired_at = Some(now);
                    self.expires_at = Some(expires_at);
                    return Ok(());
                }
                Err(StoreError::ConditionFailed) => {
                    warn!(
                        key = %self.resource_key,
                        attempt = attempt_count,
                        "lock record held by another owner"
                    );
                }
                Err(StoreError::Unavailable(cause)) => {
                    error!(
                        key = %self.resource_key,
                        attempt = attempt_count,
                        %cause,
                        "failed to write lock record"
                    );
                }
            }

            attempt_count += 1;
            std::thread::sleep(std::time::Duration::from_millis(
                BACKOFF_BASE_MS * attempt_count as u64,
            ));
        }

        error!(
            key = %self.resource_key,
            attempts = attempt_count,
            wait_timeout_secs = self.config.effective_wait_timeout_secs(),
            "lock acquisition exhausted"
        );
        Err(NetlatchError::DatabaseBusy(format!(
            "failed to acquire lock for '{}'",
            self.resource_key
        )))
    }

    /// Release the distributed lock.
    ///
    /// No-op when no non-expired lock is held locally. The conditional
    /// delete is keyed on the held `lock_id`, so a release can never delete
    /// a lock stolen after local expiry. Delete failures are logged, never
    /// propagated: the record's expiry guarantees eventual release. Local
    /// lock state and the transaction flag are cleared unconditionally
    /// after the attempt.
    pub fn release(&mut self) {
        if !self.is_lock_active() {
            debug!(key = %self.resource_key, "no active lock to release");
            return;
        }

        let lock_id = self
            .current_lock_id
            .take()
            .unwrap_or_default();

        if let Err(e) = self.store.conditional_delete(&self.resource_key, &lock_id) {
            error!(
                key = %self.resource_key,
                lock_id = %lock_id,
                error = %e,
                "lock release failed; record will expire on its own"
            );
        }

        let released_at = self.clock.now();
        let held_for = self
            .acquired_at
            .map(|acquired_at| released_at - acquired_at);
        info!(
            key = %self.resource_key,
            lock_id = %lock_id,
            held_ms = held_for.map(|d| d.num_milliseconds()).unwrap_or(0),
            "lock released"
        );

        self.acquired_at = None;
        self.expires_at = None;
        self.in_transaction = false;
    }

    /// Run one database operation under the lock protocol.
    ///
    /// The statement is classified first: a transaction-start opens a
    /// transaction and acquires the lock, a write acquires the lock, and a
    /// read proceeds without it. `body` then runs inside a scope that
    /// releases the lock on every exit path (normal return, error, or
    /// unwind), unless a transaction is open, in which case the lock is
    /// retained until [`commit`](Self::commit) or
    /// [`rollback`](Self::rollback).
    pub fn guarded<T, F>(&mut self, statement: &str, body: F) -> Result<T>
    where
        F: FnOnce() -> std::result::Result<T, BackendError>,
    {
        let normalized = sql::normalize(statement);
        let kind = sql::classify(&normalized);
        self.pending_statement = Some(normalized);

        match kind {
            StatementKind::TransactionStart => {
                self.in_transaction = true;
                if let Err(e) = self.acquire() {
                    // The transaction never got its lock, so it never started.
                    self.in_transaction = false;
                    self.pending_statement = None;
                    return Err(e);
                }
            }
            StatementKind::Write => {
                if let Err(e) = self.acquire() {
                    self.pending_statement = None;
                    return Err(e);
                }
            }
            StatementKind::Read => {}
        }

        debug!(statement = self.pending_statement.as_deref().unwrap_or(""), "executing statement");

        let scope = OperationScope { manager: self };
        let result = body();
        drop(scope);

        result.map_err(NetlatchError::Backend)
    }

    /// Finalize a transaction by committing, under the lock protocol.
    ///
    /// Fails with a lock-required error when no active lock is held; the
    /// `finalize` closure does not run in that case. On finalize success the
    /// lock is released; on failure it is retained, because the database is
    /// in a state that must stay exclusively held until resolved.
    pub fn commit<T, F>(&mut self, finalize: F) -> Result<T>
    where
        F: FnOnce() -> std::result::Result<T, BackendError>,
    {
        self.finalize_transaction("commit", finalize)
    }

    /// Finalize a transaction by rolling back, under the lock protocol.
    ///
    /// Same lock-required precondition and retain-on-failure behavior as
    /// [`commit`](Self::commit).
    pub fn rollback<T, F>(&mut self, finalize: F) -> Result<T>
    where
        F: FnOnce() -> std::result::Result<T, BackendError>,
    {
        self.finalize_transaction("rollback", finalize)
    }

    fn finalize_transaction<T, F>(&mut self, boundary: &str, finalize: F) -> Result<T>
    where
        F: FnOnce() -> std::result::Result<T, BackendError>,
    {
        if !self.is_lock_active() {
            return Err(NetlatchError::LockRequired(format!(
                "database lock is required for transaction {}",
                boundary
            )));
        }

        match finalize() {
            Ok(value) => {
                debug!(key = %self.resource_key, "transaction {} succeeded; releasing lock", boundary);
                self.release();
                Ok(value)
            }
            Err(e) => {
                error!(
                    key = %self.resource_key,
                    error = %e,
                    "transaction {} failed; lock retained", boundary
                );
                Err(NetlatchError::Backend(e))
            }
        }
    }
}

/// Drop guard for one guarded operation.
///
/// Releases the lock when the scope exits by any path, unless a transaction
/// is open; always clears the pending statement.
struct OperationScope<'a, S: LockStore, C: Clock> {
    manager: &'a mut LockManager<S, C>,
}

impl<S: LockStore, C: Clock> Drop for OperationScope<'_, S, C> {
    fn drop(&mut self) {
        if !self.manager.in_transaction {
            self.manager.release();
        }
        self.manager.pending_statement = None;
    }
}
