//! The closed set of transaction shapes the harness can run.

use crate::txn::manager::{CommitResult, ConcurrencyManager};

const TRANSFER_AMOUNT: i64 = 10;

pub type ExecuteFn = Box<dyn Fn(&ConcurrencyManager, &[String]) -> CommitResult + Send + Sync>;

/// One transaction shape: a name (for metrics), the number of distinct
/// keys it needs, and the body that runs one attempt as a fresh
/// transaction and returns its commit result.
pub struct WorkloadTemplate {
    pub name: &'static str,
    pub num_input_keys: usize,
    pub execute: ExecuteFn,
}

/// Stored balances are decimal integers; absent keys read as zero.
/// A malformed value is a workload bug and panics the worker.
fn parse_balance(value: Option<String>) -> i64 {
    value.map_or(0, |v| v.parse().expect("balance value is a decimal integer"))
}

/// Move a fixed amount between two accounts. Zero-sum.
pub fn transfer_template() -> WorkloadTemplate {
    WorkloadTemplate {
        name: "transfer",
        num_input_keys: 2,
        execute: Box::new(|mgr, keys| {
            let mut txn = mgr.begin("transfer", keys);

            let balance_a = parse_balance(mgr.read(&mut txn, &keys[0]));
            let balance_b = parse_balance(mgr.read(&mut txn, &keys[1]));

            mgr.write(&mut txn, &keys[0], &(balance_a - TRANSFER_AMOUNT).to_string());
            mgr.write(&mut txn, &keys[1], &(balance_b + TRANSFER_AMOUNT).to_string());

            mgr.commit(&mut txn)
        }),
    }
}

/// Read one account. Read-only, but still commits so OCC validates it.
pub fn balance_check_template() -> WorkloadTemplate {
    WorkloadTemplate {
        name: "balance_check",
        num_input_keys: 1,
        execute: Box::new(|mgr, keys| {
            let mut txn = mgr.begin("balance_check", keys);
            mgr.read(&mut txn, &keys[0]);
            mgr.commit(&mut txn)
        }),
    }
}

/// Increment every one of `n` keys.
pub fn write_heavy_template(n: usize) -> WorkloadTemplate {
    WorkloadTemplate {
        name: "write_heavy",
        num_input_keys: n,
        execute: Box::new(|mgr, keys| {
            let mut txn = mgr.begin("write_heavy", keys);

            for key in keys {
                let current = parse_balance(mgr.read(&mut txn, key));
                mgr.write(&mut txn, key, &(current + 1).to_string());
            }

            mgr.commit(&mut txn)
        }),
    }
}
