use std::time::{Duration, Instant};

use super::config::StopCondition;

/// The duration-bound end of a run, shared by value with every request task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deadline {
    started: Instant,
    duration: Duration,
}

impl Deadline {
    #[must_use]
    pub fn new(started: Instant, duration: Duration) -> Self {
        Self { started, duration }
    }

    /// Time budget left for a call started now. Shrinks monotonically and saturates at zero.
    #[must_use]
    pub fn remaining(&self) -> Duration {
        self.duration.saturating_sub(self.started.elapsed())
    }

    /// True once strictly more than the configured duration has elapsed.
    #[must_use]
    pub fn is_over(&self) -> bool {
        self.started.elapsed() > self.duration
    }
}

/// Decides, one launch at a time, whether the dispatcher may start another call.
///
/// Owned by the dispatch loop only, so the launch counter needs no synchronization.
#[derive(Debug)]
pub struct LaunchGate {
    requests: Option<u64>,
    deadline: Option<Deadline>,
    launched: u64,
}

impl LaunchGate {
    #[must_use]
    pub fn new(stop: StopCondition, started: Instant) -> Self {
        match stop {
            StopCondition::Requests(n) => Self {
                requests: Some(n),
                deadline: None,
                launched: 0,
            },
            StopCondition::Duration(d) => Self {
                requests: None,
                deadline: Some(Deadline::new(started, d)),
                launched: 0,
            },
        }
    }

    /// Evaluated before each launch.
    #[must_use]
    pub fn is_stopped(&self) -> bool {
        if let Some(total) = self.requests
            && self.launched >= total
        {
            return true;
        }

        self.deadline.as_ref().is_some_and(Deadline::is_over)
    }

    pub fn record_launch(&mut self) {
        self.launched = self.launched.saturating_add(1);
    }

    #[must_use]
    pub fn launched(&self) -> u64 {
        self.launched
    }

    #[must_use]
    pub fn deadline(&self) -> Option<Deadline> {
        self.deadline
    }
}
