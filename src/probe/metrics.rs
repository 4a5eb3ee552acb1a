//! Prometheus metrics for probe sweeps

use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use crate::models::{EndpointResult, ProbeReport};

/// Bucket boundaries in milliseconds
const BUCKETS_MS: &[u64] = &[10, 25, 50, 100, 200, 300, 500, 1_000, 2_000, 3_000, 5_000];

/// Simple histogram for per-source mean latency
#[derive(Debug)]
pub struct LatencyHistogram {
    counts: Vec<AtomicU64>,
    /// Sum of all observations (milliseconds)
    sum: AtomicU64,
    count: AtomicU64,
}

impl LatencyHistogram {
    pub fn new() -> Self {
        Self {
            counts: BUCKETS_MS.iter().map(|_| AtomicU64::new(0)).collect(),
            sum: AtomicU64::new(0),
            count: AtomicU64::new(0),
        }
    }

    pub fn record(&self, value_ms: u64) {
        if let Some(i) = BUCKETS_MS.iter().position(|&b| value_ms <= b) {
            self.counts[i].fetch_add(1, Ordering::Relaxed);
        }
        self.sum.fetch_add(value_ms, Ordering::Relaxed);
        self.count.fetch_add(1, Ordering::Relaxed);
    }

    /// Mean latency in milliseconds
    pub fn mean(&self) -> f64 {
        let count = self.count.load(Ordering::Relaxed);
        if count == 0 {
            return 0.0;
        }
        self.sum.load(Ordering::Relaxed) as f64 / count as f64
    }

    pub fn count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }

    /// Export as Prometheus histogram format (seconds)
    pub fn to_prometheus(&self, name: &str, labels: &str) -> String {
        let mut output = String::new();
        let mut cumulative = 0u64;

        for (i, &boundary) in BUCKETS_MS.iter().enumerate() {
            cumulative += self.counts[i].load(Ordering::Relaxed);
            output.push_str(&format!(
                "{}_bucket{{{},le=\"{}\"}} {}\n",
                name,
                labels,
                boundary as f64 / 1_000.0,
                cumulative
            ));
        }

        let total = self.count.load(Ordering::Relaxed);
        output.push_str(&format!("{}_bucket{{{},le=\"+Inf\"}} {}\n", name, labels, total));
        output.push_str(&format!(
            "{}_sum{{{}}} {}\n",
            name,
            labels,
            self.sum.load(Ordering::Relaxed) as f64 / 1_000.0
        ));
        output.push_str(&format!("{}_count{{{}}} {}\n", name, labels, total));
        output
    }
}

impl Default for LatencyHistogram {
    fn default() -> Self {
        Self::new()
    }
}

/// Sweep metrics registry
#[derive(Debug, Default)]
pub struct SweepMetrics {
    /// Mean latency per source across sweeps
    pub latency: RwLock<BTreeMap<String, LatencyHistogram>>,
    /// Result counts keyed by (source, status)
    pub results: RwLock<BTreeMap<(String, &'static str), u64>>,
    pub sweeps_total: AtomicU64,
    pub sweep_failures_total: AtomicU64,
    pub last_sweep_duration_ms: AtomicU64,
    pub last_sweep_reachable: AtomicU64,
}

impl SweepMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_report(&self, report: &ProbeReport, elapsed: Duration) {
        for result in &report.results {
            self.record_result(result);
        }
        self.sweeps_total.fetch_add(1, Ordering::Relaxed);
        self.last_sweep_duration_ms
            .store(elapsed.as_millis() as u64, Ordering::Relaxed);
        self.last_sweep_reachable
            .store(report.reachable_count() as u64, Ordering::Relaxed);
    }

    pub fn record_sweep_failure(&self) {
        self.sweep_failures_total.fetch_add(1, Ordering::Relaxed);
    }

    fn record_result(&self, result: &EndpointResult) {
        *self
            .results
            .write()
            .entry((result.name.clone(), result.status.as_str()))
            .or_insert(0) += 1;

        if result.is_success() {
            self.latency
                .write()
                .entry(result.name.clone())
                .or_default()
                .record(result.latency_ms as u64);
        }
    }

    /// Export all metrics in Prometheus format
    pub fn to_prometheus(&self) -> String {
        let mut output = String::new();

        output.push_str("# HELP pipspeed_source_latency_seconds Mean HEAD latency per source and sweep\n");
        output.push_str("# TYPE pipspeed_source_latency_seconds histogram\n");
        for (source, hist) in self.latency.read().iter() {
            let labels = format!("source=\"{}\"", escape_label(source));
            output.push_str(&hist.to_prometheus("pipspeed_source_latency_seconds", &labels));
        }

        output.push_str("\n# HELP pipspeed_source_results_total Source results by status\n");
        output.push_str("# TYPE pipspeed_source_results_total counter\n");
        for ((source, status), count) in self.results.read().iter() {
            output.push_str(&format!(
                "pipspeed_source_results_total{{source=\"{}\",status=\"{}\"}} {}\n",
                escape_label(source),
                status,
                count
            ));
        }

        output.push_str("\n# HELP pipspeed_sweeps_total Completed sweeps\n");
        output.push_str("# TYPE pipspeed_sweeps_total counter\n");
        output.push_str(&format!(
            "pipspeed_sweeps_total {}\n",
            self.sweeps_total.load(Ordering::Relaxed)
        ));

        output.push_str("\n# HELP pipspeed_sweep_failures_total Sweeps that could not run\n");
        output.push_str("# TYPE pipspeed_sweep_failures_total counter\n");
        output.push_str(&format!(
            "pipspeed_sweep_failures_total {}\n",
            self.sweep_failures_total.load(Ordering::Relaxed)
        ));

        output.push_str("\n# HELP pipspeed_last_sweep_duration_seconds Wall time of the last sweep\n");
        output.push_str("# TYPE pipspeed_last_sweep_duration_seconds gauge\n");
        output.push_str(&format!(
            "pipspeed_last_sweep_duration_seconds {}\n",
            self.last_sweep_duration_ms.load(Ordering::Relaxed) as f64 / 1_000.0
        ));

        output.push_str("\n# HELP pipspeed_last_sweep_reachable Reachable sources in the last sweep\n");
        output.push_str("# TYPE pipspeed_last_sweep_reachable gauge\n");
        output.push_str(&format!(
            "pipspeed_last_sweep_reachable {}\n",
            self.last_sweep_reachable.load(Ordering::Relaxed)
        ));

        output
    }
}

fn escape_label(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
}
