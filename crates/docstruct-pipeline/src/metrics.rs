//! Counters for pipeline runs

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Shared run and section counters
///
/// Cloning yields a handle to the same counters, so one instance can be
/// handed to every runner and read from elsewhere (e.g. a metrics route).
#[derive(Debug, Clone, Default)]
pub struct PipelineMetrics {
    counters: Arc<Counters>,
}

#[derive(Debug, Default)]
struct Counters {
    runs_started: AtomicU64,
    runs_completed: AtomicU64,
    runs_failed: AtomicU64,
    runs_cancelled: AtomicU64,
    sections_processed: AtomicU64,
    sections_degraded: AtomicU64,
    service_calls: AtomicU64,
    retries: AtomicU64,
}

/// Point-in-time copy of the counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    /// Runs started
    pub runs_started: u64,
    /// Runs that ended with an archive
    pub runs_completed: u64,
    /// Runs that ended with a fatal error
    pub runs_failed: u64,
    /// Runs abandoned by their consumer
    pub runs_cancelled: u64,
    /// Section records written
    pub sections_processed: u64,
    /// Section records written as fallbacks
    pub sections_degraded: u64,
    /// Structuring attempts made
    pub service_calls: u64,
    /// Attempts that were retries of a failed attempt
    pub retries: u64,
}

impl PipelineMetrics {
    /// Create new zeroed metrics
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_run_started(&self) {
        self.counters.runs_started.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_run_completed(&self) {
        self.counters.runs_completed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_run_failed(&self) {
        self.counters.runs_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_run_cancelled(&self) {
        self.counters.runs_cancelled.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_section(&self, degraded: bool) {
        self.counters.sections_processed.fetch_add(1, Ordering::Relaxed);
        if degraded {
            self.counters.sections_degraded.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub(crate) fn record_call(&self) {
        self.counters.service_calls.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_retry(&self) {
        self.counters.retries.fetch_add(1, Ordering::Relaxed);
    }

    /// Read all counters
    pub fn snapshot(&self) -> MetricsSnapshot {
        let c = &self.counters;
        MetricsSnapshot {
            runs_started: c.runs_started.load(Ordering::Relaxed),
            runs_completed: c.runs_completed.load(Ordering::Relaxed),
            runs_failed: c.runs_failed.load(Ordering::Relaxed),
            runs_cancelled: c.runs_cancelled.load(Ordering::Relaxed),
            sections_processed: c.sections_processed.load(Ordering::Relaxed),
            sections_degraded: c.sections_degraded.load(Ordering::Relaxed),
            service_calls: c.service_calls.load(Ordering::Relaxed),
            retries: c.retries.load(Ordering::Relaxed),
        }
    }

    /// Generate a summary report of metrics
    pub fn summary(&self) -> String {
        let s = self.snapshot();
        [
            "Pipeline Metrics Summary".to_string(),
            "========================".to_string(),
            format!(
                "Runs: {} started, {} completed, {} failed, {} cancelled",
                s.runs_started, s.runs_completed, s.runs_failed, s.runs_cancelled
            ),
            format!(
                "Sections: {} processed ({} degraded)",
                s.sections_processed, s.sections_degraded
            ),
            format!("Service calls: {} ({} retries)", s.service_calls, s.retries),
        ]
        .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clones_share_counters() {
        let metrics = PipelineMetrics::new();
        let handle = metrics.clone();

        handle.record_run_started();
        handle.record_section(false);
        handle.record_section(true);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.runs_started, 1);
        assert_eq!(snapshot.sections_processed, 2);
        assert_eq!(snapshot.sections_degraded, 1);
    }

    #[test]
    fn test_summary_mentions_counts() {
        let metrics = PipelineMetrics::new();
        metrics.record_call();
        metrics.record_call();
        metrics.record_retry();

        let summary = metrics.summary();
        assert!(summary.contains("Service calls: 2 (1 retries)"));
    }
}
