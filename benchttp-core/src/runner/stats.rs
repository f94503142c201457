use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use super::report::Report;

/// Outcome tallies of one run, shared by every request task.
///
/// Each `record_*` call is synchronized on its own. [`RunStats::summarize`] is meant to run after
/// every task has been joined; it does not try to produce a consistent view while writers are
/// still active.
#[derive(Debug, Default)]
pub struct RunStats {
    requests_total: AtomicU64,
    errors_total: AtomicU64,
    late_arrivals_total: AtomicU64,
    status_counts: Mutex<HashMap<u16, u64>>,
    error_counts: Mutex<HashMap<String, u64>>,
}

impl RunStats {
    pub fn requests_total(&self) -> u64 {
        self.requests_total.load(Ordering::Relaxed)
    }

    pub fn errors_total(&self) -> u64 {
        self.errors_total.load(Ordering::Relaxed)
    }

    pub fn late_arrivals_total(&self) -> u64 {
        self.late_arrivals_total.load(Ordering::Relaxed)
    }

    /// A call completed with an HTTP response, whatever its status.
    pub fn record_success(&self, status: u16) {
        self.requests_total.fetch_add(1, Ordering::Relaxed);

        let mut map = self
            .status_counts
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *map.entry(status).or_insert(0) += 1;
    }

    /// A call failed at the transport level.
    pub fn record_failure(&self, description: &str) {
        self.requests_total.fetch_add(1, Ordering::Relaxed);
        self.errors_total.fetch_add(1, Ordering::Relaxed);

        let mut map = self
            .error_counts
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(count) = map.get_mut(description) {
            *count += 1;
        } else {
            map.insert(description.to_string(), 1);
        }
    }

    /// A call completed after the deadline; its outcome is not counted anywhere else.
    pub fn record_late_arrival(&self) {
        self.late_arrivals_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn summarize(&self, elapsed: Duration) -> Report {
        let status_counts = {
            let map = self
                .status_counts
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            map.iter().map(|(k, v)| (*k, *v)).collect()
        };

        let error_counts = {
            let map = self
                .error_counts
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            map.iter().map(|(k, v)| (k.clone(), *v)).collect()
        };

        Report {
            elapsed,
            requests_total: self.requests_total(),
            errors_total: self.errors_total(),
            late_arrivals_total: self.late_arrivals_total(),
            status_counts,
            error_counts,
        }
    }
}
