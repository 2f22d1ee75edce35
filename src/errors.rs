use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum ConfigError {
    #[error("core_workers must be a positive integer")]
    CoreWorkers,
    #[error("max_workers must be >= core_workers")]
    MaxWorkers,
}

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum PoolError {
    #[error("pool is closed")]
    Closed,
    #[error("no idle workers and the pool is at max size")]
    Rejected,
    #[error("pool did not drain before the shutdown deadline")]
    ShutdownTimeout,
}
