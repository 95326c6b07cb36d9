//! Conflux Transactional Concurrency-Control Engine
//!
//! Coordinates concurrent read/write transactions over a shared key space
//! stored in an embedded key/value store. Two interchangeable protocols are
//! provided: Optimistic Concurrency Control with backward validation, and
//! Conservative Two-Phase Locking with all-or-nothing lock acquisition.
//! A multi-threaded workload harness measures throughput, abort rate and
//! latency distributions under configurable contention.

pub mod metrics;
pub mod storage;
pub mod txn;
pub mod workload;

// Re-export main types
pub use metrics::MetricsCollector;
pub use storage::Database;
pub use txn::{
    CommitResult, ConcurrencyManager, LockTable, OccManager, Transaction, TwoPlManager, TxnStatus,
};
pub use workload::{
    ContentionConfig, ExecutorConfig, KeySelector, WorkloadExecutor, WorkloadTemplate,
};

/// Engine error type
#[derive(Debug, thiserror::Error)]
pub enum ConfluxError {
    #[error("storage error: {0}")]
    Storage(#[from] sled::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ConfluxError>;
