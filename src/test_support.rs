//! Shared test doubles for the lock manager and session tests.

use crate::clock::Clock;
use crate::store::{LockRecord, LockStore, StoreError, StoreResult};
use chrono::{DateTime, TimeZone, Utc};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

/// A clock that only moves when told to.
///
/// Clones share the same underlying instant, so a test can hand the clock to
/// a manager and keep advancing it from outside.
#[derive(Debug, Clone)]
pub(crate) struct ManualClock {
    now: Arc<Mutex<DateTime<Utc>>>,
}

impl ManualClock {
    /// Clock frozen at `secs` past the Unix epoch.
    pub(crate) fn at(secs: i64) -> Self {
        Self {
            now: Arc::new(Mutex::new(Utc.timestamp_opt(secs, 0).unwrap())),
        }
    }

    pub(crate) fn set(&self, secs: i64) {
        *self.now.lock().unwrap() = Utc.timestamp_opt(secs, 0).unwrap();
    }

    pub(crate) fn advance_secs(&self, secs: i64) {
        let mut now = self.now.lock().unwrap();
        *now += chrono::Duration::seconds(secs);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}

/// Wraps a store and counts the calls that reach it.
#[derive(Debug, Default)]
pub(crate) struct CountingStore<S> {
    pub(crate) inner: S,
    puts: AtomicU32,
    deletes: AtomicU32,
    last_delete: Mutex<Option<(String, String)>>,
}

impl<S> CountingStore<S> {
    pub(crate) fn new(inner: S) -> Self {
        Self {
            inner,
            puts: AtomicU32::new(0),
            deletes: AtomicU32::new(0),
            last_delete: Mutex::new(None),
        }
    }

    pub(crate) fn puts(&self) -> u32 {
        self.puts.load(Ordering::SeqCst)
    }

    pub(crate) fn deletes(&self) -> u32 {
        self.deletes.load(Ordering::SeqCst)
    }

    /// The `(key, expected_lock_id)` of the most recent conditional delete.
    pub(crate) fn last_delete(&self) -> Option<(String, String)> {
        self.last_delete.lock().unwrap().clone()
    }
}

impl<S: LockStore> LockStore for CountingStore<S> {
    fn conditional_put(
        &self,
        key: &str,
        record: &LockRecord,
        now: DateTime<Utc>,
    ) -> StoreResult<()> {
        self.puts.fetch_add(1, Ordering::SeqCst);
        self.inner.conditional_put(key, record, now)
    }

    fn conditional_delete(&self, key: &str, expected_lock_id: &str) -> StoreResult<()> {
        self.deletes.fetch_add(1, Ordering::SeqCst);
        *self.last_delete.lock().unwrap() =
            Some((key.to_string(), expected_lock_id.to_string()));
        self.inner.conditional_delete(key, expected_lock_id)
    }
}

/// A store whose conditional put always reports the lock as held.
#[derive(Debug, Default)]
pub(crate) struct RejectingStore {
    puts: AtomicU32,
}

impl RejectingStore {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn puts(&self) -> u32 {
        self.puts.load(Ordering::SeqCst)
    }
}

impl LockStore for RejectingStore {
    fn conditional_put(
        &self,
        _key: &str,
        _record: &LockRecord,
        _now: DateTime<Utc>,
    ) -> StoreResult<()> {
        self.puts.fetch_add(1, Ordering::SeqCst);
        Err(StoreError::ConditionFailed)
    }

    fn conditional_delete(&self, _key: &str, _expected_lock_id: &str) -> StoreResult<()> {
        Err(StoreError::ConditionFailed)
    }
}
