use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Errors are Clone because one composite failure is delivered to every pending request's
/// completion handle.
#[derive(Error, Debug, Clone)]
pub enum Error {
    #[error("Merge Error - {0}")]
    Merge(String),

    #[error("Execution Error - {0}")]
    Execution(String),

    #[error("Config Error - {0}")]
    Config(String),

    #[error("request dispatch was cancelled")]
    Cancelled,
}
