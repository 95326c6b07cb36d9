//! Conservative two-phase locking.
//!
//! Every lock a transaction will ever need is acquired atomically in
//! `begin`, before any read or write executes. No transaction ever holds a
//! subset of its keys while waiting, so the deadlock cycle condition cannot
//! form. Lock contention is absorbed inside `begin` with randomised
//! exponential backoff; `commit` therefore never fails.

use std::sync::atomic::{AtomicU64, Ordering};
use std::thread;
use std::time::Duration;

use rand::Rng;

use crate::storage::Database;
use crate::txn::lock::LockTable;
use crate::txn::manager::CommitResult;
use crate::txn::transaction::{Transaction, TxnStatus};

/// Base backoff between failed lock-acquisition attempts.
pub const DEFAULT_LOCK_BACKOFF_US: u64 = 100;

/// Exponent cap: backoff grows up to 2^10 times the base.
const MAX_BACKOFF_SHIFT: u32 = 10;

/// Conservative 2PL transaction manager.
pub struct TwoPlManager {
    db: Database,
    lock_table: LockTable,
    txn_id_counter: AtomicU64,
    base_backoff_us: u64,
}

/// Releases a transaction's locks when dropped, so commit cannot leak
/// them even if write application panics midway.
struct ReleaseOnExit<'a> {
    lock_table: &'a LockTable,
    txn_id: u64,
    keys: &'a [String],
}

impl Drop for ReleaseOnExit<'_> {
    fn drop(&mut self) {
        self.lock_table.release_all(self.txn_id, self.keys);
    }
}

impl TwoPlManager {
    pub fn new(db: Database) -> Self {
        Self::with_backoff(db, DEFAULT_LOCK_BACKOFF_US)
    }

    pub fn with_backoff(db: Database, base_backoff_us: u64) -> Self {
        Self {
            db,
            lock_table: LockTable::new(),
            txn_id_counter: AtomicU64::new(0),
            base_backoff_us,
        }
    }

    /// Start a transaction holding every key in `keys`.
    ///
    /// Loops until the whole lock set is acquired in one shot, sleeping
    /// `base * 2^min(retry, 10)` microseconds plus jitter in
    /// `[0, backoff/2]` between attempts. `retry_count` reports how many
    /// attempts failed.
    ///
    /// An empty key list acquires nothing and returns immediately; such a
    /// transaction runs unserialised against concurrent writers, which is
    /// the caller's responsibility.
    pub fn begin(&self, type_name: &str, keys: &[String]) -> Transaction {
        let txn_id = self.txn_id_counter.fetch_add(1, Ordering::SeqCst) + 1;
        let mut txn = Transaction::new(txn_id, type_name);
        txn.lock_keys = keys.to_vec();

        let mut rng = rand::thread_rng();
        let mut retry: u32 = 0;
        while !self.lock_table.try_acquire_all(txn.txn_id, &txn.lock_keys) {
            let backoff_us = self.base_backoff_us << retry.min(MAX_BACKOFF_SHIFT);
            let jitter_us = rng.gen_range(0..=backoff_us / 2);
            thread::sleep(Duration::from_micros(backoff_us + jitter_us));
            retry += 1;
        }
        txn.retry_count = retry;
        txn
    }

    pub fn read(&self, txn: &mut Transaction, key: &str) -> Option<String> {
        txn.read(key, &self.db)
    }

    pub fn write(&self, txn: &mut Transaction, key: &str, value: &str) {
        txn.write(key, value);
    }

    /// Apply buffered writes and release all locks (shrinking phase).
    ///
    /// Always succeeds: no conflicting transaction can have run
    /// concurrently on any of the locked keys.
    pub fn commit(&self, txn: &mut Transaction) -> CommitResult {
        let _release = ReleaseOnExit {
            lock_table: &self.lock_table,
            txn_id: txn.txn_id,
            keys: &txn.lock_keys,
        };

        for (key, value) in &txn.write_set {
            self.db.put(key, value);
        }

        txn.status = TxnStatus::Committed;

        CommitResult {
            success: true,
            txn_id: txn.txn_id,
            retries: txn.retry_count,
        }
    }

    /// Discard local state and release all locks.
    pub fn abort(&self, txn: &mut Transaction) {
        txn.status = TxnStatus::Aborted;
        txn.read_set.clear();
        txn.write_set.clear();
        self.lock_table.release_all(txn.txn_id, &txn.lock_keys);
    }

    pub fn lock_table(&self) -> &LockTable {
        &self.lock_table
    }
}
