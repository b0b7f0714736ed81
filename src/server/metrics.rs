//! Server metrics
//!
//! Lightweight atomic counters rendered in Prometheus text format.

use std::fmt::Write as FmtWrite;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// Atomic counter for thread-safe incrementing
#[derive(Debug, Default)]
pub struct Counter {
    value: AtomicU64,
}

impl Counter {
    pub fn inc(&self) {
        self.value.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add(&self, n: u64) {
        self.value.fetch_add(n, Ordering::Relaxed);
    }

    pub fn get(&self) -> u64 {
        self.value.load(Ordering::Relaxed)
    }
}

/// Counters tracked across all jobs for the lifetime of the server.
#[derive(Debug)]
pub struct ServerMetrics {
    started_at: Instant,
    pub jobs_started: Counter,
    pub jobs_completed: Counter,
    pub jobs_failed: Counter,
    pub jobs_canceled: Counter,
    pub results_recorded: Counter,
    pub results_dropped: Counter,
}

impl Default for ServerMetrics {
    fn default() -> Self {
        Self {
            started_at: Instant::now(),
            jobs_started: Counter::default(),
            jobs_completed: Counter::default(),
            jobs_failed: Counter::default(),
            jobs_canceled: Counter::default(),
            results_recorded: Counter::default(),
            results_dropped: Counter::default(),
        }
    }
}

impl ServerMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }

    /// Render all counters in Prometheus text exposition format.
    pub fn render_prometheus(&self) -> String {
        let mut out = String::new();
        let gauges: &[(&str, &str, u64)] = &[
            (
                "linkpulse_jobs_started_total",
                "Crawl jobs accepted",
                self.jobs_started.get(),
            ),
            (
                "linkpulse_jobs_completed_total",
                "Crawl jobs finished successfully",
                self.jobs_completed.get(),
            ),
            (
                "linkpulse_jobs_failed_total",
                "Crawl jobs that failed",
                self.jobs_failed.get(),
            ),
            (
                "linkpulse_jobs_canceled_total",
                "Crawl jobs canceled by request",
                self.jobs_canceled.get(),
            ),
            (
                "linkpulse_results_recorded_total",
                "Link records stored in job buffers",
                self.results_recorded.get(),
            ),
            (
                "linkpulse_results_dropped_total",
                "Link records dropped by the per-job buffer cap",
                self.results_dropped.get(),
            ),
            (
                "linkpulse_uptime_seconds",
                "Server uptime in seconds",
                self.uptime_seconds(),
            ),
        ];

        for (name, help, value) in gauges {
            let _ = writeln!(out, "# HELP {name} {help}");
            let _ = writeln!(out, "# TYPE {name} counter");
            let _ = writeln!(out, "{name} {value}");
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counter_increments() {
        let counter = Counter::default();
        counter.inc();
        counter.inc();
        counter.add(3);
        assert_eq!(counter.get(), 5);
    }

    #[test]
    fn prometheus_render_includes_all_series() {
        let metrics = ServerMetrics::new();
        metrics.jobs_started.inc();
        metrics.jobs_completed.inc();

        let text = metrics.render_prometheus();
        assert!(text.contains("linkpulse_jobs_started_total 1"));
        assert!(text.contains("linkpulse_jobs_completed_total 1"));
        assert!(text.contains("linkpulse_jobs_failed_total 0"));
        assert!(text.contains("# HELP linkpulse_jobs_started_total"));
    }
}
