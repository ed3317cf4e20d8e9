//! Lock store backed by a directory of lock files.
//!
//! Each resource key maps to one `<name>.lock` file containing the JSON
//! [`LockRecord`]. Acquisition uses **create_new** semantics (exclusive
//! create), so only one process can materialize a given lock file at a time;
//! a stale record is reclaimed by unlinking it and retrying the exclusive
//! create once.
//!
//! The atomicity of `conditional_put` is only as good as the directory's
//! create/unlink operations. That holds for local filesystems and for
//! coordination directories on filesystems with atomic exclusive create; for
//! anything weaker, use a remote conditional-write store instead.

use super::{LockRecord, LockStore, StoreError, StoreResult};
use chrono::{DateTime, Utc};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Lock store keeping one JSON lock file per resource key.
#[derive(Debug, Clone)]
pub struct FileStore {
    directory: PathBuf,
}

impl FileStore {
    /// Create a store over `directory` without touching the filesystem.
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }

    /// Create a store over `directory`, creating the directory if needed.
    pub fn open(directory: impl Into<PathBuf>) -> StoreResult<Self> {
        let store = Self::new(directory);

        if !store.directory.exists() {
            fs::create_dir_all(&store.directory).map_err(|e| {
                StoreError::Unavailable(format!(
                    "failed to create lock directory '{}': {}",
                    store.directory.display(),
                    e
                ))
            })?;
        }

        Ok(store)
    }

    /// The directory lock files are stored in.
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Path of the lock file for `key`.
    ///
    /// Key characters outside `[A-Za-z0-9._-]` are replaced with `_` so any
    /// resource key yields a valid file name.
    pub fn record_path(&self, key: &str) -> PathBuf {
        let name: String = key
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        self.directory.join(format!("{}.lock", name))
    }

    /// List all parsable lock records in the directory.
    ///
    /// Files without a `.lock` extension and files whose contents fail to
    /// parse are skipped. Results are sorted by key for consistent output.
    pub fn list(&self) -> StoreResult<Vec<LockRecord>> {
        let mut records = Vec::new();

        if !self.directory.exists() {
            return Ok(records);
        }

        let entries = fs::read_dir(&self.directory).map_err(|e| {
            StoreError::Unavailable(format!(
                "failed to read lock directory '{}': {}",
                self.directory.display(),
                e
            ))
        })?;

        for entry in entries {
            let entry = entry.map_err(|e| {
                StoreError::Unavailable(format!("failed to read lock directory entry: {}", e))
            })?;

            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("lock") {
                continue;
            }

            // Skip records another process is mid-write on or that are corrupt.
            if let Ok(record) = read_record(&path) {
                records.push(record);
            }
        }

        records.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(records)
    }

    /// Remove the record for `key` unconditionally, returning it.
    ///
    /// The caller is responsible for verifying that removal is appropriate
    /// (e.g. an operator passing `--force`).
    pub fn remove(&self, key: &str) -> StoreResult<LockRecord> {
        let path = self.record_path(key);

        if !path.exists() {
            return Err(StoreError::Unavailable(format!(
                "no lock record for '{}' at: {}",
                key,
                path.display()
            )));
        }

        let record = read_record(&path)?;

        fs::remove_file(&path).map_err(|e| {
            StoreError::Unavailable(format!(
                "failed to remove lock record '{}': {}",
                path.display(),
                e
            ))
        })?;

        Ok(record)
    }

    /// Try to create the lock file exclusively and write `record` into it.
    fn try_create(&self, path: &Path, record: &LockRecord) -> StoreResult<CreateOutcome> {
        let mut file = match OpenOptions::new().write(true).create_new(true).open(path) {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                return Ok(CreateOutcome::Exists);
            }
            Err(e) => {
                return Err(StoreError::Unavailable(format!(
                    "failed to create lock record '{}': {}",
                    path.display(),
                    e
                )));
            }
        };

        let json = serde_json::to_string_pretty(record).map_err(|e| {
            StoreError::Unavailable(format!("failed to serialize lock record: {}", e))
        })?;

        file.write_all(json.as_bytes()).map_err(|e| {
            // Do not leave a half-written record behind.
            let _ = fs::remove_file(path);
            StoreError::Unavailable(format!("failed to write lock record: {}", e))
        })?;

        file.sync_all().map_err(|e| {
            let _ = fs::remove_file(path);
            StoreError::Unavailable(format!("failed to sync lock record: {}", e))
        })?;

        Ok(CreateOutcome::Created)
    }
}

enum CreateOutcome {
    Created,
    Exists,
}

impl LockStore for FileStore {
    fn conditional_put(
        &self,
        key: &str,
        record: &LockRecord,
        now: DateTime<Utc>,
    ) -> StoreResult<()> {
        let path = self.record_path(key);

        // First pass tries the exclusive create; if a stale record is in the
        // way it is unlinked and the create retried exactly once.
        for reclaimed in [false, true] {
            match self.try_create(&path, record)? {
                CreateOutcome::Created => return Ok(()),
                CreateOutcome::Exists if reclaimed => return Err(StoreError::ConditionFailed),
                CreateOutcome::Exists => {}
            }

            let existing = match read_record(&path) {
                Ok(existing) => existing,
                // Record vanished between the create and the read; retry.
                Err(StoreError::Unavailable(_)) if !path.exists() => continue,
                Err(e) => return Err(e),
            };

            if !existing.is_stale(now) {
                return Err(StoreError::ConditionFailed);
            }

            match fs::remove_file(&path) {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => {
                    return Err(StoreError::Unavailable(format!(
                        "failed to reclaim stale lock record '{}': {}",
                        path.display(),
                        e
                    )));
                }
            }
        }

        Err(StoreError::ConditionFailed)
    }

    fn conditional_delete(&self, key: &str, expected_lock_id: &str) -> StoreResult<()> {
        let path = self.record_path(key);

        if !path.exists() {
            return Err(StoreError::ConditionFailed);
        }

        let existing = read_record(&path)?;
        if existing.lock_id != expected_lock_id {
            return Err(StoreError::ConditionFailed);
        }

        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(StoreError::ConditionFailed),
            Err(e) => Err(StoreError::Unavailable(format!(
                "failed to delete lock record '{}': {}",
                path.display(),
                e
            ))),
        }
    }
}

/// Parse a lock record from a file.
fn read_record(path: &Path) -> StoreResult<LockRecord> {
    let content = fs::read_to_string(path).map_err(|e| {
        StoreError::Unavailable(format!(
            "failed to read lock record '{}': {}",
            path.display(),
            e
        ))
    })?;

    serde_json::from_str(&content).map_err(|e| {
        StoreError::Unavailable(format!(
            "failed to parse lock record '{}': {}",
            path.display(),
            e
        ))
    })
}
