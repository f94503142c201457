mod config;
mod error;
mod gate;
mod pool;
mod report;
mod run;
mod stats;

pub use config::{DEFAULT_REQUESTS, RunConfig, StopCondition};
pub use error::{Error, Result};
pub use gate::{Deadline, LaunchGate};
pub use pool::{ClientPool, PooledClient};
pub use report::Report;
pub use run::{run, run_by_count, run_by_duration};
pub use stats::RunStats;
