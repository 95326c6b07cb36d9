//! Synthetic workload harness: templates, contention-biased key sampling
//! and the multi-threaded executor that drives a concurrency manager.

pub mod executor;
pub mod selector;
pub mod template;

pub use executor::{ExecutorConfig, WorkloadExecutor};
pub use selector::{ContentionConfig, KeySelector};
pub use template::{
    balance_check_template, transfer_template, write_heavy_template, WorkloadTemplate,
};
