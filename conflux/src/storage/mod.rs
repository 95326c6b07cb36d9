//! Storage layer - durable ordered key/value store
//!
//! Wraps an embedded [`sled`] tree behind the narrow get/put/delete
//! interface the transaction managers consume. Values are opaque strings;
//! the workload layer stores decimal integer balances in them.
//!
//! Failure policy: a backend error on `get` surfaces as absent, on
//! `put`/`delete` as `false`. Errors are logged but never retried here;
//! conflict handling is the concurrency layer's job, not storage's.

use std::collections::BTreeMap;
use std::path::Path;

use crate::Result;

/// Handle to an open database. Cloning is cheap and all clones share the
/// same underlying tree; sled serialises concurrent access internally.
#[derive(Clone)]
pub struct Database {
    db: sled::Db,
}

impl Database {
    /// Open or create a database at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let db = sled::open(path)?;
        Ok(Self { db })
    }

    /// Look up a key. Returns `None` for missing keys, non-UTF-8 values
    /// and backend failures.
    pub fn get(&self, key: &str) -> Option<String> {
        match self.db.get(key) {
            Ok(Some(value)) => String::from_utf8(value.to_vec()).ok(),
            Ok(None) => None,
            Err(e) => {
                log::warn!("get failed for key {key}: {e}");
                None
            }
        }
    }

    /// Store a key/value pair. Returns false on backend failure.
    pub fn put(&self, key: &str, value: &str) -> bool {
        match self.db.insert(key, value.as_bytes()) {
            Ok(_) => true,
            Err(e) => {
                log::warn!("put failed for key {key}: {e}");
                false
            }
        }
    }

    /// Remove a key. Returns false on backend failure.
    pub fn delete(&self, key: &str) -> bool {
        match self.db.remove(key) {
            Ok(_) => true,
            Err(e) => {
                log::warn!("delete failed for key {key}: {e}");
                false
            }
        }
    }

    /// Bulk-load initial state before a workload run.
    pub fn initialize_with_data(&self, data: &BTreeMap<String, String>) -> bool {
        data.iter().all(|(key, value)| self.put(key, value))
    }

    /// Remove every key. Destructive.
    pub fn clear(&self) -> bool {
        match self.db.clear() {
            Ok(()) => true,
            Err(e) => {
                log::warn!("clear failed: {e}");
                false
            }
        }
    }

    /// Number of keys currently stored.
    pub fn key_count(&self) -> usize {
        self.db.len()
    }

    /// Flush pending writes and close the handle.
    pub fn close(self) -> Result<()> {
        self.db.flush()?;
        Ok(())
    }
}
