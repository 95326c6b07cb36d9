//! Transaction layer - concurrency control over the storage engine
//!
//! Two interchangeable protocols coordinate concurrent transactions:
//!
//! ```text
//! ┌──────────────────────────────────────────────────┐
//! │  ConcurrencyManager (tagged dispatch)            │
//! │  - Begin / Read / Write / Commit / Abort         │
//! ├──────────────────────────────────────────────────┤
//! │  OccManager                                      │
//! │  - execute without locks, validate at commit     │
//! │  - backward validation against committed history │
//! ├──────────────────────────────────────────────────┤
//! │  TwoPlManager (conservative 2PL)                 │
//! │  - all locks acquired atomically before any work │
//! │  - commit never fails; no deadlock possible      │
//! ├──────────────────────────────────────────────────┤
//! │  Transaction                                     │
//! │  - per-transaction read/write sets               │
//! │  - buffered writes (applied on commit)           │
//! └──────────────────────────────────────────────────┘
//! ```
//!
//! A `Transaction` is owned by the worker thread that began it and is never
//! shared; the managers themselves are `Sync` and shared freely.

pub mod lock;
pub mod manager;
pub mod occ;
pub mod transaction;
pub mod twopl;

pub use lock::LockTable;
pub use manager::{CommitResult, ConcurrencyManager};
pub use occ::{CommittedRecord, OccManager};
pub use transaction::{Transaction, TxnStatus};
pub use twopl::TwoPlManager;
