use thiserror::Error;

/// Errors that can occur while talking to the job store.
#[derive(Error, Debug)]
pub enum QueWorkerError {
    /// An error occurred while executing an SQL query
    #[error("Error occured while query: {0}")]
    SqlError(#[from] sqlx::Error),

    /// An error occurred while serializing job args to JSON
    #[error("Error while serializing job args: {0}")]
    JsonSerializeError(#[from] serde_json::Error),
}

/// A Result type alias for QueWorkerError.
pub type Result<T> = core::result::Result<T, QueWorkerError>;
