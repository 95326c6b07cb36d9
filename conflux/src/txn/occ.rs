//! Optimistic concurrency control with backward validation.
//!
//! Transactions execute without any locking and are validated at commit
//! time against the history of already-committed transactions: a committer
//! whose read set overlaps the write set of any transaction that finished
//! after the committer's snapshot must abort. A single validation mutex
//! serialises validation, write application and history recording, which
//! makes `validation_ts` a total commit order.

use std::sync::atomic::{AtomicU64, Ordering};

use ahash::AHashSet;
use parking_lot::Mutex;

use crate::storage::Database;
use crate::txn::manager::CommitResult;
use crate::txn::transaction::{Transaction, TxnStatus};

/// History entry for one committed transaction.
#[derive(Debug, Clone)]
pub struct CommittedRecord {
    pub txn_id: u64,
    pub finish_ts: u64,
    pub write_keys: AHashSet<String>,
}

/// OCC transaction manager.
pub struct OccManager {
    db: Database,
    /// Last issued timestamp.
    timestamp_counter: AtomicU64,
    txn_id_counter: AtomicU64,
    /// Serialises steps 2-6 of commit: validation, apply, record.
    validation_mutex: Mutex<()>,
    committed_history: Mutex<Vec<CommittedRecord>>,
}

impl OccManager {
    pub fn new(db: Database) -> Self {
        Self {
            db,
            timestamp_counter: AtomicU64::new(0),
            txn_id_counter: AtomicU64::new(0),
            validation_mutex: Mutex::new(()),
            committed_history: Mutex::new(Vec::new()),
        }
    }

    /// Start a transaction. The snapshot timestamp is a plain load, so
    /// concurrent begins may share a `start_ts`.
    pub fn begin(&self, type_name: &str) -> Transaction {
        let txn_id = self.txn_id_counter.fetch_add(1, Ordering::SeqCst) + 1;
        let mut txn = Transaction::new(txn_id, type_name);
        txn.start_ts = self.timestamp_counter.load(Ordering::Relaxed);
        txn
    }

    pub fn read(&self, txn: &mut Transaction, key: &str) -> Option<String> {
        txn.read(key, &self.db)
    }

    pub fn write(&self, txn: &mut Transaction, key: &str, value: &str) {
        txn.write(key, value);
    }

    /// Backward validation: the committer conflicts with any transaction
    /// that finished after the committer's snapshot and wrote a key the
    /// committer read.
    fn validate(&self, txn: &Transaction) -> bool {
        let history = self.committed_history.lock();
        for record in history.iter() {
            if record.finish_ts > txn.start_ts
                && txn.read_set.keys().any(|key| record.write_keys.contains(key))
            {
                return false;
            }
        }
        true
    }

    /// Validate and, on success, apply the write set to storage.
    ///
    /// On validation failure the transaction is marked aborted and storage
    /// is untouched; the read/write sets are left in place for inspection
    /// (only an explicit abort clears them).
    pub fn commit(&self, txn: &mut Transaction) -> CommitResult {
        let _serial = self.validation_mutex.lock();

        txn.validation_ts = self.timestamp_counter.fetch_add(1, Ordering::SeqCst) + 1;

        if !self.validate(txn) {
            txn.status = TxnStatus::Aborted;
            return CommitResult {
                success: false,
                txn_id: txn.txn_id,
                retries: txn.retry_count,
            };
        }

        for (key, value) in &txn.write_set {
            self.db.put(key, value);
        }

        txn.finish_ts = self.timestamp_counter.fetch_add(1, Ordering::SeqCst) + 1;
        txn.status = TxnStatus::Committed;

        let record = CommittedRecord {
            txn_id: txn.txn_id,
            finish_ts: txn.finish_ts,
            write_keys: txn.write_set.keys().cloned().collect(),
        };
        self.committed_history.lock().push(record);

        CommitResult {
            success: true,
            txn_id: txn.txn_id,
            retries: txn.retry_count,
        }
    }

    /// Mark the transaction aborted and drop its local state.
    pub fn abort(&self, txn: &mut Transaction) {
        txn.status = TxnStatus::Aborted;
        txn.read_set.clear();
        txn.write_set.clear();
    }

    /// Drop history records no active transaction can conflict with:
    /// anything that finished at or before the oldest active snapshot.
    pub fn garbage_collect(&self, min_active_start_ts: u64) {
        self.committed_history
            .lock()
            .retain(|record| record.finish_ts > min_active_start_ts);
    }

    /// Last issued timestamp.
    pub fn current_timestamp(&self) -> u64 {
        self.timestamp_counter.load(Ordering::SeqCst)
    }

    /// Number of retained committed-history records.
    pub fn committed_history_len(&self) -> usize {
        self.committed_history.lock().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn manager() -> (TempDir, Database, OccManager) {
        let dir = TempDir::new().expect("temp dir");
        let db = Database::open(dir.path()).expect("open database");
        (dir, db.clone(), OccManager::new(db))
    }

    #[test]
    fn test_single_txn_commit() {
        let (_dir, db, mgr) = manager();
        db.put("k1", "100");

        let mut txn = mgr.begin("single");
        assert_eq!(mgr.read(&mut txn, "k1"), Some("100".to_string()));
        mgr.write(&mut txn, "k1", "200");

        let result = mgr.commit(&mut txn);
        assert!(result.success);
        assert_eq!(result.txn_id, txn.txn_id);
        assert_eq!(txn.status, TxnStatus::Committed);
        assert_eq!(db.get("k1"), Some("200".to_string()));
    }

    #[test]
    fn test_read_only_commit() {
        let (_dir, db, mgr) = manager();
        db.put("k1", "500");

        let mut txn = mgr.begin("balance_check");
        assert_eq!(mgr.read(&mut txn, "k1"), Some("500".to_string()));

        let result = mgr.commit(&mut txn);
        assert!(result.success);
        assert_eq!(db.get("k1"), Some("500".to_string()));
    }

    #[test]
    fn test_sequential_txns_no_conflict() {
        let (_dir, db, mgr) = manager();
        db.put("k1", "100");
        db.put("k2", "200");

        let mut t1 = mgr.begin("seq");
        mgr.read(&mut t1, "k1");
        mgr.write(&mut t1, "k1", "150");
        assert!(mgr.commit(&mut t1).success);

        let mut t2 = mgr.begin("seq");
        assert_eq!(mgr.read(&mut t2, "k1"), Some("150".to_string()));
        mgr.write(&mut t2, "k2", "250");
        assert!(mgr.commit(&mut t2).success);

        assert_eq!(db.get("k1"), Some("150".to_string()));
        assert_eq!(db.get("k2"), Some("250".to_string()));
    }

    #[test]
    fn test_write_read_conflict_aborts_reader() {
        let (_dir, db, mgr) = manager();
        db.put("k1", "100");

        // A reads k1, then B writes k1 and commits first
        let mut txn_a = mgr.begin("A");
        mgr.read(&mut txn_a, "k1");

        let mut txn_b = mgr.begin("B");
        mgr.read(&mut txn_b, "k1");
        mgr.write(&mut txn_b, "k1", "200");
        assert!(mgr.commit(&mut txn_b).success);

        // A's snapshot is stale; its commit must fail
        mgr.write(&mut txn_a, "k1", "300");
        let result = mgr.commit(&mut txn_a);
        assert!(!result.success);
        assert_eq!(txn_a.status, TxnStatus::Aborted);

        // Only B's write is visible
        assert_eq!(db.get("k1"), Some("200".to_string()));
    }

    #[test]
    fn test_disjoint_key_sets_do_not_conflict() {
        let (_dir, db, mgr) = manager();
        db.put("k1", "100");
        db.put("k2", "200");

        let mut txn_a = mgr.begin("A");
        mgr.read(&mut txn_a, "k1");

        let mut txn_b = mgr.begin("B");
        mgr.read(&mut txn_b, "k2");
        mgr.write(&mut txn_b, "k2", "250");
        assert!(mgr.commit(&mut txn_b).success);

        mgr.write(&mut txn_a, "k1", "150");
        assert!(mgr.commit(&mut txn_a).success);

        assert_eq!(db.get("k1"), Some("150".to_string()));
        assert_eq!(db.get("k2"), Some("250".to_string()));
    }

    #[test]
    fn test_failed_commit_does_not_apply_writes() {
        let (_dir, db, mgr) = manager();
        db.put("k1", "100");
        db.put("k2", "7");

        let mut txn_a = mgr.begin("A");
        mgr.read(&mut txn_a, "k1");
        mgr.write(&mut txn_a, "k2", "999");

        let mut txn_b = mgr.begin("B");
        mgr.write(&mut txn_b, "k1", "200");
        assert!(mgr.commit(&mut txn_b).success);

        let result = mgr.commit(&mut txn_a);
        assert!(!result.success);

        // None of A's buffered writes reached storage, and commit left
        // the sets in place for the caller to inspect
        assert_eq!(db.get("k2"), Some("7".to_string()));
        assert!(!txn_a.write_set.is_empty());
        assert!(!txn_a.read_set.is_empty());
    }

    #[test]
    fn test_abort_clears_state() {
        let (_dir, db, mgr) = manager();
        db.put("k1", "100");

        let mut txn = mgr.begin("doomed");
        mgr.read(&mut txn, "k1");
        mgr.write(&mut txn, "k1", "999");

        mgr.abort(&mut txn);
        assert_eq!(txn.status, TxnStatus::Aborted);
        assert!(txn.read_set.is_empty());
        assert!(txn.write_set.is_empty());
        assert_eq!(db.get("k1"), Some("100".to_string()));
    }

    #[test]
    fn test_timestamp_monotonicity() {
        let (_dir, db, mgr) = manager();
        db.put("k1", "0");

        let mut prev_finish = 0;
        for i in 0..10 {
            let mut txn = mgr.begin("seq");
            mgr.read(&mut txn, "k1");
            mgr.write(&mut txn, "k1", &i.to_string());
            assert!(mgr.commit(&mut txn).success);

            assert!(txn.validation_ts > 0);
            assert!(txn.start_ts <= txn.validation_ts);
            assert!(txn.finish_ts > txn.validation_ts);
            assert!(txn.finish_ts > prev_finish);
            prev_finish = txn.finish_ts;
        }
    }

    #[test]
    fn test_txn_ids_unique_and_nonzero() {
        let (_dir, _db, mgr) = manager();
        let a = mgr.begin("x");
        let b = mgr.begin("x");
        assert!(a.txn_id > 0);
        assert!(b.txn_id > a.txn_id);
    }

    #[test]
    fn test_garbage_collect_drops_old_records() {
        let (_dir, db, mgr) = manager();
        db.put("k1", "0");

        for i in 0..5 {
            let mut txn = mgr.begin("seq");
            mgr.read(&mut txn, "k1");
            mgr.write(&mut txn, "k1", &i.to_string());
            assert!(mgr.commit(&mut txn).success);
        }
        assert_eq!(mgr.committed_history_len(), 5);

        // Nothing active can have started before the latest timestamp
        mgr.garbage_collect(mgr.current_timestamp());
        assert_eq!(mgr.committed_history_len(), 0);
    }

    #[test]
    fn test_garbage_collect_keeps_newer_records() {
        let (_dir, db, mgr) = manager();
        db.put("k1", "0");

        let mut first_finish = 0;
        for i in 0..3 {
            let mut txn = mgr.begin("seq");
            mgr.read(&mut txn, "k1");
            mgr.write(&mut txn, "k1", &i.to_string());
            assert!(mgr.commit(&mut txn).success);
            if i == 0 {
                first_finish = txn.finish_ts;
            }
        }

        mgr.garbage_collect(first_finish);
        assert_eq!(mgr.committed_history_len(), 2);
    }
}
