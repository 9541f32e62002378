// ═══════════════════════════════════════════════════════════════
// METRICS COLLECTOR - tallies for a batch run
// ═══════════════════════════════════════════════════════════════
//
// Atomic counters, bumped from whichever rayon worker finished the row.
// No locks. A snapshot is taken at the end of the run and goes into the
// logs and the optional JSON run report.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use serde::Serialize;

use crate::models::Diagnosis;

/// The metrics snapshot - what gets serialized to JSON
#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct MetricsSnapshot {
    pub rows_processed: u64,
    pub legitimate: u64,
    pub potential_phishing: u64,
    pub no_match: u64,
    pub row_errors: u64,
    pub elapsed_ms: u64,
    pub rows_per_second: f64,
}

/// Thread-safe atomic metrics collector
pub struct MetricsCollector {
    rows_processed: AtomicU64,
    legitimate: AtomicU64,
    potential_phishing: AtomicU64,
    no_match: AtomicU64,
    row_errors: AtomicU64,
    start_time: Instant,
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self {
            rows_processed: AtomicU64::new(0),
            legitimate: AtomicU64::new(0),
            potential_phishing: AtomicU64::new(0),
            no_match: AtomicU64::new(0),
            row_errors: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    pub fn record_diagnosis(&self, diagnosis: Diagnosis) {
        self.rows_processed.fetch_add(1, Ordering::Relaxed);
        let counter = match diagnosis {
            Diagnosis::Legitimate => &self.legitimate,
            Diagnosis::PotentialPhishing => &self.potential_phishing,
            Diagnosis::NoMatch => &self.no_match,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_row_error(&self) {
        self.rows_processed.fetch_add(1, Ordering::Relaxed);
        self.row_errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Take a snapshot of all metrics (lock-free reads)
    pub fn snapshot(&self) -> MetricsSnapshot {
        let elapsed = self.start_time.elapsed();
        let rows_processed = self.rows_processed.load(Ordering::Relaxed);
        let secs = elapsed.as_secs_f64();
        let rows_per_second = if secs > 0.0 {
            rows_processed as f64 / secs
        } else {
            0.0
        };

        MetricsSnapshot {
            rows_processed,
            legitimate: self.legitimate.load(Ordering::Relaxed),
            potential_phishing: self.potential_phishing.load(Ordering::Relaxed),
            no_match: self.no_match.load(Ordering::Relaxed),
            row_errors: self.row_errors.load(Ordering::Relaxed),
            elapsed_ms: elapsed.as_millis() as u64,
            rows_per_second,
        }
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}
