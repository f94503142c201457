use std::time::Duration;

use super::error::{Error, Result};

/// Request count used when neither a count nor a duration is given.
pub const DEFAULT_REQUESTS: u64 = 1000;

/// When the dispatcher stops launching new calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopCondition {
    /// Stop once this many calls have been launched.
    Requests(u64),

    /// Stop once this much time has elapsed since the run started.
    Duration(Duration),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunConfig {
    pub concurrency: usize,
    pub stop: StopCondition,
}

impl RunConfig {
    #[must_use]
    pub fn by_count(concurrency: usize, requests: u64) -> Self {
        Self {
            concurrency,
            stop: StopCondition::Requests(requests),
        }
    }

    #[must_use]
    pub fn by_duration(concurrency: usize, duration: Duration) -> Self {
        Self {
            concurrency,
            stop: StopCondition::Duration(duration),
        }
    }

    /// Builds a config from optional user overrides.
    ///
    /// Setting both `requests` and `duration` is rejected; setting neither falls back to
    /// [`DEFAULT_REQUESTS`].
    pub fn resolve(
        concurrency: usize,
        requests: Option<u64>,
        duration: Option<Duration>,
    ) -> Result<Self> {
        let stop = match (requests, duration) {
            (Some(_), Some(_)) => return Err(Error::ConflictingStopConditions),
            (Some(n), None) => StopCondition::Requests(n),
            (None, Some(d)) => StopCondition::Duration(d),
            (None, None) => StopCondition::Requests(DEFAULT_REQUESTS),
        };

        let cfg = Self { concurrency, stop };
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        if self.concurrency == 0 {
            return Err(Error::InvalidConcurrency);
        }

        match self.stop {
            StopCondition::Requests(0) => Err(Error::InvalidRequests),
            StopCondition::Duration(d) if d.is_zero() => Err(Error::InvalidDuration),
            _ => Ok(()),
        }
    }
}
