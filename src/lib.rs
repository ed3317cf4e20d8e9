//! netlatch: distributed mutual-exclusion lock for file-backed databases on
//! shared network filesystems.
//!
//! A single-writer database file shared over a network filesystem cannot
//! rely on the filesystem's own locking. netlatch enforces exclusion
//! externally: every connection routes its lifecycle events through a
//! [`LockManager`] that holds a named lock in a strongly-consistent remote
//! key-value store via atomic conditional writes. Crash recovery comes from
//! lock expiry: an abandoned record goes stale and the next acquirer steals
//! it.
//!
//! # Example
//!
//! ```no_run
//! use netlatch::{FileStore, GuardedSession, LockConfig, LockManager, StoreSession};
//! # struct Conn;
//! # impl StoreSession for Conn {
//! #     fn connect(&mut self) -> Result<(), netlatch::BackendError> { Ok(()) }
//! #     fn close(&mut self) -> Result<(), netlatch::BackendError> { Ok(()) }
//! #     fn execute(&mut self, _: &str) -> Result<(), netlatch::BackendError> { Ok(()) }
//! #     fn commit(&mut self) -> Result<(), netlatch::BackendError> { Ok(()) }
//! #     fn rollback(&mut self) -> Result<(), netlatch::BackendError> { Ok(()) }
//! # }
//!
//! # fn main() -> netlatch::Result<()> {
//! let store = FileStore::open("/var/lock/netlatch")
//!     .map_err(|e| netlatch::NetlatchError::UserError(e.to_string()))?;
//! let config = LockConfig::new("db-locks", 30);
//! let manager = LockManager::new(store, config, "/srv/data/app.db")?;
//!
//! let mut session = GuardedSession::new(Conn, manager);
//! session.connect()?;
//! session.execute("BEGIN")?;
//! session.execute("INSERT INTO users VALUES (1, 'John')")?;
//! session.commit()?;
//! session.close()?;
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod clock;
pub mod commands;
pub mod config;
pub mod error;
pub mod exit_codes;
pub mod manager;
pub mod session;
pub mod sql;
pub mod store;

#[cfg(test)]
mod test_support;

pub use clock::{Clock, SystemClock};
pub use config::LockConfig;
pub use error::{BackendError, NetlatchError, Result};
pub use manager::LockManager;
pub use session::{GuardedSession, StoreSession};
pub use sql::{StatementKind, classify, normalize};
pub use store::{FileStore, LockRecord, LockStore, MemoryStore, StoreError, StoreResult};
