//! Protocol dispatch shared by the workload layer.

use crate::txn::occ::OccManager;
use crate::txn::transaction::Transaction;
use crate::txn::twopl::TwoPlManager;

/// Outcome of a commit attempt.
#[derive(Debug, Clone, Copy)]
pub struct CommitResult {
    pub success: bool,
    pub txn_id: u64,
    /// Lock-acquisition retries the transaction accumulated in Begin.
    pub retries: u32,
}

/// The two supported protocols behind one call surface.
///
/// A closed two-variant enum instead of a trait object: the protocol set
/// is fixed and the match dispatch keeps call sites monomorphic.
pub enum ConcurrencyManager {
    Occ(OccManager),
    TwoPl(TwoPlManager),
}

impl ConcurrencyManager {
    /// Start a transaction. `keys` is the full lock set under 2PL and is
    /// ignored by OCC.
    pub fn begin(&self, type_name: &str, keys: &[String]) -> Transaction {
        match self {
            Self::Occ(mgr) => mgr.begin(type_name),
            Self::TwoPl(mgr) => mgr.begin(type_name, keys),
        }
    }

    pub fn read(&self, txn: &mut Transaction, key: &str) -> Option<String> {
        match self {
            Self::Occ(mgr) => mgr.read(txn, key),
            Self::TwoPl(mgr) => mgr.read(txn, key),
        }
    }

    pub fn write(&self, txn: &mut Transaction, key: &str, value: &str) {
        match self {
            Self::Occ(mgr) => mgr.write(txn, key, value),
            Self::TwoPl(mgr) => mgr.write(txn, key, value),
        }
    }

    pub fn commit(&self, txn: &mut Transaction) -> CommitResult {
        match self {
            Self::Occ(mgr) => mgr.commit(txn),
            Self::TwoPl(mgr) => mgr.commit(txn),
        }
    }

    pub fn abort(&self, txn: &mut Transaction) {
        match self {
            Self::Occ(mgr) => mgr.abort(txn),
            Self::TwoPl(mgr) => mgr.abort(txn),
        }
    }

    pub fn protocol_name(&self) -> &'static str {
        match self {
            Self::Occ(_) => "OCC",
            Self::TwoPl(_) => "2PL",
        }
    }
}
