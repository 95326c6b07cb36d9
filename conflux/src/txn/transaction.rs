//! Per-transaction state: read set, write set, timestamps, status.

use std::collections::HashMap;
use std::time::Instant;

use crate::storage::Database;

/// Lifecycle state of a transaction. Committed and Aborted are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxnStatus {
    Active,
    Committed,
    Aborted,
}

/// A unit of work against the key space.
///
/// Reads and writes are tracked locally; storage is only mutated when the
/// owning manager commits. The timestamp fields are used by OCC only and
/// stay zero under 2PL.
#[derive(Debug)]
pub struct Transaction {
    /// Unique, non-zero identifier.
    pub txn_id: u64,
    /// Workload template name, carried through to metrics.
    pub type_name: String,
    /// Snapshot point (OCC). Zero under 2PL.
    pub start_ts: u64,
    /// Serialisation point, assigned during commit validation (OCC).
    pub validation_ts: u64,
    /// Write-visibility point, assigned after writes apply (OCC).
    pub finish_ts: u64,
    pub status: TxnStatus,
    /// Key -> value observed on first storage read.
    pub read_set: HashMap<String, String>,
    /// Key -> value buffered for commit. Last write wins.
    pub write_set: HashMap<String, String>,
    /// Keys held under 2PL; empty for OCC.
    pub lock_keys: Vec<String>,
    /// Lock-acquisition retries observed in Begin (2PL). Zero for OCC.
    pub retry_count: u32,
    /// Wall-clock instant captured at Begin.
    pub wall_start: Instant,
}

impl Transaction {
    pub fn new(txn_id: u64, type_name: &str) -> Self {
        Self {
            txn_id,
            type_name: type_name.to_string(),
            start_ts: 0,
            validation_ts: 0,
            finish_ts: 0,
            status: TxnStatus::Active,
            read_set: HashMap::new(),
            write_set: HashMap::new(),
            lock_keys: Vec::new(),
            retry_count: 0,
            wall_start: Instant::now(),
        }
    }

    /// Read a key, preferring state local to this transaction.
    ///
    /// The write set is consulted first (read-your-writes), then the read
    /// set (repeatable read), then storage. A storage hit records the
    /// observed value in the read set. Reads of absent keys return `None`
    /// without touching the read set, so a concurrent insert of the same
    /// key is invisible to validation.
    pub fn read(&mut self, key: &str, db: &Database) -> Option<String> {
        if let Some(buffered) = self.write_set.get(key) {
            return Some(buffered.clone());
        }
        if let Some(observed) = self.read_set.get(key) {
            return Some(observed.clone());
        }

        let value = db.get(key);
        if let Some(v) = &value {
            self.read_set.insert(key.to_string(), v.clone());
        }
        value
    }

    /// Buffer a write. Storage is untouched until commit.
    pub fn write(&mut self, key: &str, value: &str) {
        self.write_set.insert(key.to_string(), value.to_string());
    }
}
