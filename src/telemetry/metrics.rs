//! Prometheus metrics implementation

use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::fmt::Write;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use crate::pipeline::Rejection;

/// Upper bounds (seconds) of the duration histogram buckets
const DURATION_BUCKETS: [f64; 11] = [0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0];

/// Process-local metrics registry
pub struct MetricsRegistry {
    counters: RwLock<BTreeMap<String, AtomicU64>>,
    gauges: RwLock<BTreeMap<String, AtomicU64>>,
    histograms: RwLock<BTreeMap<String, Histogram>>,
}

impl MetricsRegistry {
    pub fn new() -> Self {
        Self {
            counters: RwLock::new(BTreeMap::new()),
            gauges: RwLock::new(BTreeMap::new()),
            histograms: RwLock::new(BTreeMap::new()),
        }
    }

    /// Increment a counter
    pub fn counter_inc(&self, name: &str, value: u64) {
        let counters = self.counters.read();
        if let Some(counter) = counters.get(name) {
            counter.fetch_add(value, Ordering::Relaxed);
        } else {
            drop(counters);
            let mut counters = self.counters.write();
            counters
                .entry(name.to_string())
                .or_insert_with(|| AtomicU64::new(0))
                .fetch_add(value, Ordering::Relaxed);
        }
    }

    pub fn counter_get(&self, name: &str) -> u64 {
        self.counters
            .read()
            .get(name)
            .map(|c| c.load(Ordering::Relaxed))
            .unwrap_or(0)
    }

    /// Set a gauge value
    pub fn gauge_set(&self, name: &str, value: u64) {
        let gauges = self.gauges.read();
        if let Some(gauge) = gauges.get(name) {
            gauge.store(value, Ordering::Relaxed);
        } else {
            drop(gauges);
            self.gauges
                .write()
                .entry(name.to_string())
                .or_insert_with(|| AtomicU64::new(0))
                .store(value, Ordering::Relaxed);
        }
    }

    /// Record a histogram observation
    pub fn histogram_observe(&self, name: &str, value: f64) {
        let histograms = self.histograms.read();
        if let Some(hist) = histograms.get(name) {
            hist.observe(value);
        } else {
            drop(histograms);
            let mut histograms = self.histograms.write();
            histograms
                .entry(name.to_string())
                .or_insert_with(Histogram::new)
                .observe(value);
        }
    }

    /// Export metrics in Prometheus text format.
    ///
    /// Keys may carry a label set (`name{label="v"}`); series sharing a base
    /// name get a single `# TYPE` line.
    pub fn export_prometheus(&self) -> String {
        let mut output = String::new();
        let mut typed = Vec::new();

        let mut type_line = |output: &mut String, key: &str, kind: &str| {
            let base = base_name(key).to_string();
            if !typed.contains(&base) {
                let _ = writeln!(output, "# TYPE {} {}", base, kind);
                typed.push(base);
            }
        };

        for (name, counter) in self.counters.read().iter() {
            type_line(&mut output, name, "counter");
            let _ = writeln!(output, "{} {}", name, counter.load(Ordering::Relaxed));
        }

        for (name, gauge) in self.gauges.read().iter() {
            type_line(&mut output, name, "gauge");
            let _ = writeln!(output, "{} {}", name, gauge.load(Ordering::Relaxed));
        }

        for (name, hist) in self.histograms.read().iter() {
            type_line(&mut output, name, "histogram");
            let count = hist.count();
            for (bound, cumulative) in DURATION_BUCKETS.iter().zip(hist.cumulative_buckets()) {
                let _ = writeln!(output, "{}_bucket{{le=\"{}\"}} {}", name, bound, cumulative);
            }
            let _ = writeln!(output, "{}_bucket{{le=\"+Inf\"}} {}", name, count);
            let _ = writeln!(output, "{}_sum {}", name, hist.sum());
            let _ = writeln!(output, "{}_count {}", name, count);
        }

        output
    }

    /// Reset all metrics
    pub fn reset(&self) {
        self.counters.write().clear();
        self.gauges.write().clear();
        self.histograms.write().clear();
    }
}

impl Default for MetricsRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn base_name(key: &str) -> &str {
    key.split('{').next().unwrap_or(key)
}

/// Fixed-bucket histogram
pub struct Histogram {
    buckets: [AtomicU64; DURATION_BUCKETS.len()],
    /// Sum in microseconds
    sum_micros: AtomicU64,
    count: AtomicU64,
}

impl Histogram {
    pub fn new() -> Self {
        Self {
            buckets: Default::default(),
            sum_micros: AtomicU64::new(0),
            count: AtomicU64::new(0),
        }
    }

    pub fn observe(&self, value: f64) {
        if let Some(index) = DURATION_BUCKETS.iter().position(|&bound| value <= bound) {
            self.buckets[index].fetch_add(1, Ordering::Relaxed);
        }
        self.sum_micros
            .fetch_add((value.max(0.0) * 1_000_000.0) as u64, Ordering::Relaxed);
        self.count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }

    pub fn sum(&self) -> f64 {
        self.sum_micros.load(Ordering::Relaxed) as f64 / 1_000_000.0
    }

    /// Observations at or below each bucket bound
    pub fn cumulative_buckets(&self) -> Vec<u64> {
        self.buckets
            .iter()
            .scan(0, |total, bucket| {
                *total += bucket.load(Ordering::Relaxed);
                Some(*total)
            })
            .collect()
    }
}

impl Default for Histogram {
    fn default() -> Self {
        Self::new()
    }
}

/// Pre-defined metric names
pub mod metric_names {
    pub const REQUESTS_TOTAL: &str = "leetcoach_requests_total";
    pub const REQUEST_DURATION: &str = "leetcoach_request_duration_seconds";
    pub const REJECTIONS_TOTAL: &str = "leetcoach_rejections_total";
    pub const HANDLER_FAILURES_TOTAL: &str = "leetcoach_handler_failures_total";
    pub const TRACKED_CLIENTS: &str = "leetcoach_rate_limit_tracked_clients";
}

/// Gateway metrics recorded by the access log stage
pub struct GatewayMetrics {
    registry: MetricsRegistry,
}

impl GatewayMetrics {
    pub fn new() -> Self {
        Self {
            registry: MetricsRegistry::new(),
        }
    }

    /// Record a request that produced a response
    pub fn record_request(&self, method: &str, status: u16, duration: Duration) {
        let key = format!(
            "{}{{method=\"{}\",status=\"{}\"}}",
            metric_names::REQUESTS_TOTAL,
            method,
            status
        );
        self.registry.counter_inc(&key, 1);
        self.registry
            .histogram_observe(metric_names::REQUEST_DURATION, duration.as_secs_f64());
    }

    /// Record a short-circuit by a gating stage
    pub fn record_rejection(&self, rejection: Rejection) {
        let key = format!(
            "{}{{reason=\"{}\"}}",
            metric_names::REJECTIONS_TOTAL,
            rejection.as_str()
        );
        self.registry.counter_inc(&key, 1);
    }

    /// Record a failure propagated from the handler.
    ///
    /// The request is also counted under status 500, the status it is served with.
    pub fn record_handler_failure(&self, method: &str, duration: Duration) {
        self.record_request(method, 500, duration);
        self.registry
            .counter_inc(metric_names::HANDLER_FAILURES_TOTAL, 1);
    }

    pub fn set_tracked_clients(&self, count: usize) {
        self.registry
            .gauge_set(metric_names::TRACKED_CLIENTS, count as u64);
    }

    pub fn rejections(&self, rejection: Rejection) -> u64 {
        self.registry.counter_get(&format!(
            "{}{{reason=\"{}\"}}",
            metric_names::REJECTIONS_TOTAL,
            rejection.as_str()
        ))
    }

    pub fn handler_failures(&self) -> u64 {
        self.registry
            .counter_get(metric_names::HANDLER_FAILURES_TOTAL)
    }

    /// Export all metrics in Prometheus format
    pub fn export(&self) -> String {
        self.registry.export_prometheus()
    }

    pub fn registry(&self) -> &MetricsRegistry {
        &self.registry
    }
}

impl Default for GatewayMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for GatewayMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayMetrics").finish_non_exhaustive()
    }
}
