//! Conflux workload benchmark driver
//!
//! Usage:
//!   conflux-bench --protocol occ --threads 8 --total-keys 1000
//!
//! Preloads `total_keys` accounts at a fixed balance, runs the synthetic
//! workload against the selected protocol and prints a performance report
//! followed by a balance reconciliation.

use std::collections::BTreeMap;
use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use conflux::txn::occ::OccManager;
use conflux::txn::twopl::TwoPlManager;
use conflux::workload::template::{
    balance_check_template, transfer_template, write_heavy_template,
};
use conflux::{
    ConcurrencyManager, ContentionConfig, Database, ExecutorConfig, MetricsCollector,
    WorkloadExecutor,
};

const INITIAL_BALANCE: i64 = 1000;
const WRITE_HEAVY_KEYS: usize = 4;

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Protocol {
    /// Optimistic concurrency control with backward validation
    #[value(name = "occ")]
    Occ,
    /// Conservative two-phase locking
    #[value(name = "2pl")]
    TwoPl,
}

#[derive(Parser, Debug)]
#[command(name = "conflux-bench")]
#[command(about = "Transactional concurrency-control workload benchmark")]
#[command(version)]
struct Args {
    /// Number of worker threads
    #[arg(long, default_value_t = 4)]
    threads: usize,

    /// Transactions issued per thread
    #[arg(long, default_value_t = 100)]
    txns_per_thread: usize,

    /// Total number of accounts
    #[arg(long, default_value_t = 1000)]
    total_keys: usize,

    /// Size of the hot key set
    #[arg(long, default_value_t = 10)]
    hotset_size: usize,

    /// Probability of sampling from the hot set
    #[arg(long, default_value_t = 0.5)]
    hotset_prob: f64,

    /// Concurrency-control protocol
    #[arg(long, value_enum, default_value = "occ")]
    protocol: Protocol,

    /// Database directory
    #[arg(long, default_value = "transaction_db")]
    db_path: PathBuf,
}

fn total_balance(db: &Database, total_keys: usize) -> i64 {
    (0..total_keys)
        .filter_map(|i| db.get(&format!("account_{i}")))
        .filter_map(|v| v.parse::<i64>().ok())
        .sum()
}

fn run(args: Args) -> conflux::Result<()> {
    let db = Database::open(&args.db_path)?;

    // Fresh balances for every run
    db.clear();
    let mut initial_data = BTreeMap::new();
    for i in 0..args.total_keys {
        initial_data.insert(format!("account_{i}"), INITIAL_BALANCE.to_string());
    }
    db.initialize_with_data(&initial_data);
    log::info!(
        "database initialized with {} accounts at balance {INITIAL_BALANCE}",
        db.key_count()
    );

    let initial_total = total_balance(&db, args.total_keys);

    let mgr = match args.protocol {
        Protocol::Occ => ConcurrencyManager::Occ(OccManager::new(db.clone())),
        Protocol::TwoPl => ConcurrencyManager::TwoPl(TwoPlManager::new(db.clone())),
    };

    println!("Transaction Processing System");
    println!("=============================");
    println!("Protocol:         {}", mgr.protocol_name());
    println!("Threads:          {}", args.threads);
    println!("Txns per thread:  {}", args.txns_per_thread);
    println!(
        "Keys:             {} total, hot set {} (p = {})",
        args.total_keys, args.hotset_size, args.hotset_prob
    );

    let metrics = MetricsCollector::new();
    let config = ExecutorConfig {
        num_threads: args.threads,
        txns_per_thread: args.txns_per_thread,
        contention: ContentionConfig {
            total_keys: args.total_keys,
            hotset_size: args.hotset_size,
            hotset_probability: args.hotset_prob,
        },
        templates: vec![
            transfer_template(),
            balance_check_template(),
            write_heavy_template(WRITE_HEAVY_KEYS),
        ],
        ..ExecutorConfig::default()
    };

    let mut executor = WorkloadExecutor::new(&mgr, &metrics, config);
    executor.run();

    metrics.print_report(executor.elapsed_seconds());

    if let ConcurrencyManager::Occ(occ) = &mgr {
        let before = occ.committed_history_len();
        occ.garbage_collect(occ.current_timestamp());
        log::info!(
            "garbage collected {} committed-history records",
            before - occ.committed_history_len()
        );
    }

    let final_total = total_balance(&db, args.total_keys);
    println!("\n--- Balance Reconciliation ---");
    println!("Initial total: {initial_total}");
    println!("Final total:   {final_total}");
    println!("Net change:    {}", final_total - initial_total);

    db.close()
}

fn main() {
    env_logger::init();

    let args = Args::parse();
    if let Err(e) = run(args) {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
