//! In-process lock store backed by a mutex-guarded map.
//!
//! The reference implementation of the conditional-write contract. Useful
//! for tests and for coordinating connections within a single process; it
//! provides no cross-process safety.

use super::{LockRecord, LockStore, StoreError, StoreResult};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Mutex;

/// Mutex-guarded map of lock records.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: Mutex<HashMap<String, LockRecord>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current record for `key`, if any.
    pub fn get(&self, key: &str) -> Option<LockRecord> {
        self.lock_records().get(key).cloned()
    }

    /// Number of records currently held.
    pub fn len(&self) -> usize {
        self.lock_records().len()
    }

    /// Whether the store holds no records.
    pub fn is_empty(&self) -> bool {
        self.lock_records().is_empty()
    }

    fn lock_records(&self) -> std::sync::MutexGuard<'_, HashMap<String, LockRecord>> {
        self.records
            .lock()
            .unwrap_or_else(|poison| poison.into_inner())
    }
}

impl LockStore for MemoryStore {
    fn conditional_put(
        &self,
        key: &str,
        record: &LockRecord,
        now: DateTime<Utc>,
    ) -> StoreResult<()> {
        let mut records = self.lock_records();

        if let Some(existing) = records.get(key)
            && !existing.is_stale(now)
        {
            return Err(StoreError::ConditionFailed);
        }

        records.insert(key.to_string(), record.clone());
        Ok(())
    }

    fn conditional_delete(&self, key: &str, expected_lock_id: &str) -> StoreResult<()> {
        let mut records = self.lock_records();

        match records.get(key) {
            Some(existing) if existing.lock_id == expected_lock_id => {
                records.remove(key);
                Ok(())
            }
            _ => Err(StoreError::ConditionFailed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    fn record(key: &str, lock_id: &str, acquired: i64, expires: i64) -> LockRecord {
        LockRecord::new(key, lock_id, ts(acquired), ts(expires))
    }

    #[test]
    fn put_succeeds_when_absent() {
        let store = MemoryStore::new();

        store
            .conditional_put("k", &record("k", "a", 1000, 1010), ts(1000))
            .unwrap();

        assert_eq!(store.get("k").unwrap().lock_id, "a");
    }

    #[test]
    fn put_fails_while_record_is_fresh() {
        let store = MemoryStore::new();
        store
            .conditional_put("k", &record("k", "a", 1000, 1010), ts(1000))
            .unwrap();

        let err = store
            .conditional_put("k", &record("k", "b", 1005, 1015), ts(1005))
            .unwrap_err();

        assert!(matches!(err, StoreError::ConditionFailed));
        assert_eq!(store.get("k").unwrap().lock_id, "a");
    }

    #[test]
    fn put_steals_an_expired_record() {
        let store = MemoryStore::new();
        store
            .conditional_put("k", &record("k", "a", 1000, 1010), ts(1000))
            .unwrap();

        store
            .conditional_put("k", &record("k", "b", 1011, 1021), ts(1011))
            .unwrap();

        assert_eq!(store.get("k").unwrap().lock_id, "b");
    }

    #[test]
    fn delete_requires_matching_lock_id() {
        let store = MemoryStore::new();
        store
            .conditional_put("k", &record("k", "a", 1000, 1010), ts(1000))
            .unwrap();

        let err = store.conditional_delete("k", "other").unwrap_err();
        assert!(matches!(err, StoreError::ConditionFailed));
        assert!(store.get("k").is_some());

        store.conditional_delete("k", "a").unwrap();
        assert!(store.is_empty());
    }

    #[test]
    fn delete_of_absent_record_fails_condition() {
        let store = MemoryStore::new();

        let err = store.conditional_delete("missing", "a").unwrap_err();
        assert!(matches!(err, StoreError::ConditionFailed));
    }

    #[test]
    fn keys_are_independent() {
        let store = MemoryStore::new();
        store
            .conditional_put("k1", &record("k1", "a", 1000, 1010), ts(1000))
            .unwrap();
        store
            .conditional_put("k2", &record("k2", "b", 1000, 1010), ts(1000))
            .unwrap();

        assert_eq!(store.len(), 2);
        store.conditional_delete("k1", "a").unwrap();
        assert_eq!(store.get("k2").unwrap().lock_id, "b");
    }
}
