//! Per-template workload metrics: commit/abort counters and latency
//! distributions.
//!
//! Locking discipline: the top-level map mutex is held only long enough to
//! fetch or insert an entry. Counters are atomic; each latency vector has
//! its own mutex, so recording a commit for one template never blocks
//! another template's readers.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

#[derive(Default)]
pub struct PerTypeStat {
    pub commits: AtomicU64,
    pub aborts: AtomicU64,
    latencies_us: Mutex<Vec<f64>>,
}

#[derive(Default)]
pub struct MetricsCollector {
    stats: Mutex<HashMap<String, Arc<PerTypeStat>>>,
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self::default()
    }

    fn stat(&self, type_name: &str) -> Arc<PerTypeStat> {
        let mut stats = self.stats.lock();
        stats.entry(type_name.to_string()).or_default().clone()
    }

    pub fn record_commit(&self, type_name: &str, latency_us: f64) {
        let stat = self.stat(type_name);
        stat.commits.fetch_add(1, Ordering::Relaxed);
        stat.latencies_us.lock().push(latency_us);
    }

    pub fn record_abort(&self, type_name: &str) {
        self.stat(type_name).aborts.fetch_add(1, Ordering::Relaxed);
    }

    /// Aborted attempts as a percentage of all attempts, zero when the
    /// template never ran.
    pub fn abort_percentage(&self, type_name: &str) -> f64 {
        let stat = self.stat(type_name);
        abort_pct(&stat)
    }

    /// Committed transactions per second over the whole run.
    pub fn throughput(&self, elapsed_s: f64) -> f64 {
        if elapsed_s <= 0.0 {
            return 0.0;
        }
        self.total_commits() as f64 / elapsed_s
    }

    pub fn avg_response_time(&self, type_name: &str) -> f64 {
        let stat = self.stat(type_name);
        avg_latency(&stat)
    }

    /// Interpolated percentile over the recorded latencies.
    ///
    /// Sorts a snapshot and indexes it at `p/100 * (n-1)`, linearly
    /// interpolating between the two nearest ranks.
    pub fn percentile(&self, type_name: &str, p: f64) -> f64 {
        let stat = self.stat(type_name);
        percentile_of(&stat, p)
    }

    pub fn latency_sample_count(&self, type_name: &str) -> usize {
        self.stat(type_name).latencies_us.lock().len()
    }

    pub fn total_commits(&self) -> u64 {
        let stats = self.stats.lock();
        stats.values().map(|s| s.commits.load(Ordering::Relaxed)).sum()
    }

    pub fn total_aborts(&self) -> u64 {
        let stats = self.stats.lock();
        stats.values().map(|s| s.aborts.load(Ordering::Relaxed)).sum()
    }

    /// Dump the run summary to stdout.
    pub fn print_report(&self, elapsed_s: f64) {
        let total_commits = self.total_commits();
        let total_aborts = self.total_aborts();
        let throughput = self.throughput(elapsed_s);

        println!("\n========== Performance Report ==========");
        println!("Elapsed time:    {elapsed_s:.2} s");
        println!("Total commits:   {total_commits}");
        println!("Total aborts:    {total_aborts}");
        println!("Throughput:      {throughput:.2} txn/s");

        let total_all = total_commits + total_aborts;
        if total_all > 0 {
            let overall_abort_pct = 100.0 * total_aborts as f64 / total_all as f64;
            println!("Overall abort %: {overall_abort_pct:.2}%");
        }

        println!("\n--- Per-Type Breakdown ---");
        let stats = self.stats.lock();
        for (type_name, stat) in stats.iter() {
            println!("\n  [{type_name}]");
            println!("    Commits:       {}", stat.commits.load(Ordering::Relaxed));
            println!("    Aborts:        {}", stat.aborts.load(Ordering::Relaxed));
            println!("    Abort %:       {:.2}%", abort_pct(stat));
            println!("    Avg latency:   {:.2} us", avg_latency(stat));
            println!("    P50 latency:   {:.2} us", percentile_of(stat, 50.0));
            println!("    P90 latency:   {:.2} us", percentile_of(stat, 90.0));
            println!("    P99 latency:   {:.2} us", percentile_of(stat, 99.0));
        }
        println!("========================================");
    }
}

fn abort_pct(stat: &PerTypeStat) -> f64 {
    let commits = stat.commits.load(Ordering::Relaxed);
    let aborts = stat.aborts.load(Ordering::Relaxed);
    let total = commits + aborts;
    if total == 0 {
        return 0.0;
    }
    100.0 * aborts as f64 / total as f64
}

fn avg_latency(stat: &PerTypeStat) -> f64 {
    let latencies = stat.latencies_us.lock();
    if latencies.is_empty() {
        return 0.0;
    }
    latencies.iter().sum::<f64>() / latencies.len() as f64
}

fn percentile_of(stat: &PerTypeStat, p: f64) -> f64 {
    let mut sorted = stat.latencies_us.lock().clone();
    if sorted.is_empty() {
        return 0.0;
    }
    sorted.sort_by(|a, b| a.total_cmp(b));

    let index = (p / 100.0) * (sorted.len() - 1) as f64;
    let lo = index.floor() as usize;
    let hi = index.ceil() as usize;
    if lo == hi {
        return sorted[lo];
    }
    let frac = index - lo as f64;
    sorted[lo] * (1.0 - frac) + sorted[hi] * frac
}
