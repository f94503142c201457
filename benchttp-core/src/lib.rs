pub mod runner;

pub use benchttp_http::{
    BasicAuth, ClientOptions, Error as HttpError, HttpClient, HttpResponse,
    HttpTransportErrorKind, Method, RequestTemplate,
};
pub use runner::{
    ClientPool, Deadline, Error, LaunchGate, PooledClient, Report, Result, RunConfig, RunStats,
    StopCondition, run, run_by_count, run_by_duration,
};
