//! Exclusive lock table for conservative two-phase locking.

use ahash::AHashMap;
use parking_lot::Mutex;

/// Key-level exclusive lock table.
///
/// Maps each locked key to the owning transaction id; absence means free.
/// There is no shared mode and no waiter queue, so fairness is whatever
/// the callers' retry timing produces.
#[derive(Default)]
pub struct LockTable {
    table: Mutex<AHashMap<String, u64>>,
}

impl LockTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Atomically acquire every key for `txn_id`, or nothing at all.
    ///
    /// Scans all requested keys under the table mutex first; if any is
    /// held by another transaction the call returns false without
    /// mutating the table. Keys already owned by `txn_id` do not block.
    pub fn try_acquire_all(&self, txn_id: u64, keys: &[String]) -> bool {
        let mut table = self.table.lock();

        if keys
            .iter()
            .any(|key| table.get(key).is_some_and(|&owner| owner != txn_id))
        {
            return false;
        }

        for key in keys {
            table.insert(key.clone(), txn_id);
        }
        true
    }

    /// Release every key in `keys` owned by `txn_id`. Entries held by
    /// other transactions are left alone, so a stale release is harmless.
    pub fn release_all(&self, txn_id: u64, keys: &[String]) {
        let mut table = self.table.lock();
        for key in keys {
            if table.get(key) == Some(&txn_id) {
                table.remove(key);
            }
        }
    }

    /// Current owner of a key, if locked.
    pub fn owner(&self, key: &str) -> Option<u64> {
        self.table.lock().get(key).copied()
    }
}
