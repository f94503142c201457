pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("http client setup failed: {0}")]
    Http(#[from] benchttp_http::Error),

    #[error("request task failed: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error("`concurrency` must be a positive integer")]
    InvalidConcurrency,

    #[error("`requests` must be a positive integer")]
    InvalidRequests,

    #[error("`duration` must be a positive duration")]
    InvalidDuration,

    #[error("set either a request count or a duration, not both")]
    ConflictingStopConditions,

    #[error("client pool closed while the run was in progress")]
    PoolClosed,
}
