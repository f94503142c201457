use std::collections::BTreeMap;
use std::time::Duration;

/// Outcome of a finished run. Built once, after every in-flight call was drained.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    pub elapsed: Duration,
    /// Completed calls that were counted: responses plus transport errors.
    pub requests_total: u64,
    pub errors_total: u64,
    /// Calls that completed after the deadline and were left out of every other field.
    pub late_arrivals_total: u64,
    pub status_counts: BTreeMap<u16, u64>,
    pub error_counts: BTreeMap<String, u64>,
}

impl Report {
    pub fn responses_total(&self) -> u64 {
        self.status_counts.values().sum()
    }

    pub fn requests_per_sec(&self) -> f64 {
        per_sec(self.requests_total, self.elapsed)
    }

    pub fn responses_per_sec(&self) -> f64 {
        per_sec(self.responses_total(), self.elapsed)
    }

    pub fn error_rate_pct(&self) -> f64 {
        if self.requests_total == 0 {
            return 0.0;
        }
        (self.errors_total as f64) / (self.requests_total as f64) * 100.0
    }

    /// Error descriptions, most frequent first; ties ordered by description.
    pub fn errors_by_frequency(&self) -> Vec<(&str, u64)> {
        let mut out: Vec<(&str, u64)> = self
            .error_counts
            .iter()
            .map(|(description, count)| (description.as_str(), *count))
            .collect();
        out.sort_by(|(a_desc, a_count), (b_desc, b_count)| {
            b_count.cmp(a_count).then_with(|| a_desc.cmp(b_desc))
        });
        out
    }

    /// `requests_total == responses + errors` and the error tally matches the error count.
    pub fn is_consistent(&self) -> bool {
        let errors: u64 = self.error_counts.values().sum();
        errors == self.errors_total && self.requests_total == self.responses_total() + errors
    }
}

fn per_sec(count: u64, elapsed: Duration) -> f64 {
    let secs = elapsed.as_secs_f64().max(1e-9);
    (count as f64) / secs
}
