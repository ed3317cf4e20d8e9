//! Session integration shim.
//!
//! [`StoreSession`] is the capability the underlying database exposes:
//! connect, close, execute, commit, rollback. [`GuardedSession`] wraps one
//! such session together with a [`LockManager`] and routes every lifecycle
//! event through the lock protocol, so callers use the guarded session
//! exactly like the bare one and never touch the lock directly.

use crate::clock::{Clock, SystemClock};
use crate::error::{BackendError, NetlatchError, Result};
use crate::manager::LockManager;
use crate::store::LockStore;
use tracing::warn;

/// The underlying database session, treated as an external capability.
pub trait StoreSession {
    /// Open the connection to the database.
    fn connect(&mut self) -> std::result::Result<(), BackendError>;

    /// Close the connection.
    fn close(&mut self) -> std::result::Result<(), BackendError>;

    /// Execute one statement.
    fn execute(&mut self, statement: &str) -> std::result::Result<(), BackendError>;

    /// Commit the open transaction.
    fn commit(&mut self) -> std::result::Result<(), BackendError>;

    /// Roll back the open transaction.
    fn rollback(&mut self) -> std::result::Result<(), BackendError>;
}

/// A database session with every lifecycle event guarded by the
/// distributed lock.
#[derive(Debug)]
pub struct GuardedSession<D, S, C = SystemClock> {
    db: D,
    manager: LockManager<S, C>,
}

impl<D: StoreSession, S: LockStore, C: Clock> GuardedSession<D, S, C> {
    /// Wrap `db` with the given lock manager.
    pub fn new(db: D, manager: LockManager<S, C>) -> Self {
        Self { db, manager }
    }

    /// The lock manager guarding this session.
    pub fn manager(&self) -> &LockManager<S, C> {
        &self.manager
    }

    /// Mutable access to the lock manager, for explicit acquire/release.
    pub fn manager_mut(&mut self) -> &mut LockManager<S, C> {
        &mut self.manager
    }

    /// Whether the session currently holds the distributed lock.
    pub fn is_lock_active(&self) -> bool {
        self.manager.is_lock_active()
    }

    /// Unwrap back into the bare database session.
    pub fn into_inner(self) -> D {
        self.db
    }

    /// Open the connection.
    ///
    /// When a crash-recovery marker is present, another party's transaction
    /// was interrupted; the lock is acquired before the connection opens and
    /// released once it is established.
    pub fn connect(&mut self) -> Result<()> {
        if self.manager.recovery_marker_exists() {
            warn!(
                database = %self.manager.database_path().display(),
                "recovery marker found; acquiring lock before opening connection"
            );
            self.manager.acquire()?;
        }

        self.db.connect().map_err(NetlatchError::Backend)?;
        self.manager.release();
        Ok(())
    }

    /// Close the connection.
    ///
    /// An open transaction forces the lock to be held across the close. A
    /// recovery marker without an open transaction means another session's
    /// transaction may still be in flight, so the close is skipped entirely.
    pub fn close(&mut self) -> Result<()> {
        if self.manager.in_transaction() {
            self.manager.acquire()?;
        } else if self.manager.recovery_marker_exists() {
            warn!(
                database = %self.manager.database_path().display(),
                "recovery marker exists; skipping connection close"
            );
            return Ok(());
        }

        self.db.close().map_err(NetlatchError::Backend)?;
        self.manager.release();
        Ok(())
    }

    /// Execute one statement under the lock protocol.
    pub fn execute(&mut self, statement: &str) -> Result<()> {
        let db = &mut self.db;
        self.manager.guarded(statement, || db.execute(statement))
    }

    /// Commit the open transaction and release the lock.
    pub fn commit(&mut self) -> Result<()> {
        let db = &mut self.db;
        self.manager.commit(|| db.commit())
    }

    /// Roll back the open transaction and release the lock.
    pub fn rollback(&mut self) -> Result<()> {
        let db = &mut self.db;
        self.manager.rollback(|| db.rollback())
    }
}
