//! Basic Metrics
//!
//! Per-operation request counters and latency tracking for the HTTP API.

use parking_lot::RwLock;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Counters for one operation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct OperationCounts {
    pub total: u64,
    pub errors: u64,
}

/// Point-in-time copy of the collector, served on `/metrics`
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub total_ops: u64,
    pub operations: BTreeMap<String, OperationCounts>,
    pub latency_avg_us: f64,
    pub latency_min_us: u64,
    pub latency_max_us: u64,
}

/// Metrics collector
#[derive(Debug)]
pub struct Metrics {
    /// Total operations count
    total_ops: AtomicU64,

    /// Counts per operation name
    operations: RwLock<BTreeMap<String, OperationCounts>>,

    latency_sum_us: AtomicU64,
    latency_count: AtomicU64,
    latency_min_us: AtomicU64,
    latency_max_us: AtomicU64,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            total_ops: AtomicU64::new(0),
            operations: RwLock::new(BTreeMap::new()),
            latency_sum_us: AtomicU64::new(0),
            latency_count: AtomicU64::new(0),
            latency_min_us: AtomicU64::new(u64::MAX),
            latency_max_us: AtomicU64::new(0),
        }
    }

    /// Record a finished operation
    pub fn record_operation(&self, operation: &str, latency: Duration, success: bool) {
        self.total_ops.fetch_add(1, Ordering::Relaxed);

        {
            let mut ops = self.operations.write();
            let counts = ops.entry(operation.to_string()).or_default();
            counts.total += 1;
            if !success {
                counts.errors += 1;
            }
        }

        let latency_us = latency.as_micros() as u64;
        self.latency_sum_us.fetch_add(latency_us, Ordering::Relaxed);
        self.latency_count.fetch_add(1, Ordering::Relaxed);
        self.latency_min_us.fetch_min(latency_us, Ordering::Relaxed);
        self.latency_max_us.fetch_max(latency_us, Ordering::Relaxed);
    }

    pub fn total_ops(&self) -> u64 {
        self.total_ops.load(Ordering::Relaxed)
    }

    /// Counts for `operation`, zero if never seen
    pub fn operation(&self, operation: &str) -> OperationCounts {
        self.operations.read().get(operation).copied().unwrap_or_default()
    }

    /// Average latency in microseconds
    pub fn avg_latency_us(&self) -> f64 {
        let count = self.latency_count.load(Ordering::Relaxed);
        if count == 0 {
            return 0.0;
        }
        let sum = self.latency_sum_us.load(Ordering::Relaxed);
        sum as f64 / count as f64
    }

    pub fn min_latency_us(&self) -> u64 {
        let min = self.latency_min_us.load(Ordering::Relaxed);
        if min == u64::MAX {
            0
        } else {
            min
        }
    }

    pub fn max_latency_us(&self) -> u64 {
        self.latency_max_us.load(Ordering::Relaxed)
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            total_ops: self.total_ops(),
            operations: self.operations.read().clone(),
            latency_avg_us: self.avg_latency_us(),
            latency_min_us: self.min_latency_us(),
            latency_max_us: self.max_latency_us(),
        }
    }

    /// One-line summary for logs
    pub fn summary(&self) -> String {
        format!(
            "Operations: {} | Latency (µs): avg={:.1}, min={}, max={}",
            self.total_ops(),
            self.avg_latency_us(),
            self.min_latency_us(),
            self.max_latency_us()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics() {
        let metrics = Metrics::new();

        metrics.record_operation("ask", Duration::from_micros(100), true);
        metrics.record_operation("ask", Duration::from_micros(200), false);
        metrics.record_operation("ingest", Duration::from_micros(150), true);

        assert_eq!(metrics.total_ops(), 3);
        assert_eq!(metrics.min_latency_us(), 100);
        assert_eq!(metrics.max_latency_us(), 200);
        assert!((metrics.avg_latency_us() - 150.0).abs() < 0.1);

        assert_eq!(metrics.operation("ask"), OperationCounts { total: 2, errors: 1 });
        assert_eq!(metrics.operation("ingest"), OperationCounts { total: 1, errors: 0 });
        assert_eq!(metrics.operation("health"), OperationCounts::default());
    }

    #[test]
    fn test_empty_metrics() {
        let metrics = Metrics::new();
        assert_eq!(metrics.min_latency_us(), 0);
        assert_eq!(metrics.avg_latency_us(), 0.0);
        assert!(metrics.summary().starts_with("Operations: 0"));
    }

    #[test]
    fn test_snapshot_serializes() {
        let metrics = Metrics::new();
        metrics.record_operation("ingest", Duration::from_micros(42), true);

        let json = serde_json::to_value(metrics.snapshot()).unwrap();
        assert_eq!(json["total_ops"], 1);
        assert_eq!(json["operations"]["ingest"]["total"], 1);
        assert_eq!(json["latency_max_us"], 42);
    }
}
