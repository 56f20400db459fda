use chrono::{DateTime, Utc};
use getset::Getters;
use sqlx::FromRow;

/// A row of the `que_jobs` table.
///
/// The column names (`job_id`, `job_class`, ...) are fixed by the Que schema
/// shared with the other Que implementations; the Rust field names follow
/// the conventions of the Go port.
#[derive(FromRow, Getters, Debug, Clone, PartialEq, Eq)]
#[getset(get = "pub")]
pub struct Job {
    /// Unique identifier; doubles as the session advisory lock key
    #[sqlx(rename = "job_id")]
    id: i64,
    /// Name of the queue the job belongs to (empty string = default queue)
    queue: String,
    /// Lower number means it should run sooner
    priority: i16,
    /// The job must not be worked before this time
    run_at: DateTime<Utc>,
    /// Selects the handler in the dispatch table
    #[sqlx(rename = "job_class")]
    job_type: String,
    /// The JSON payload of the job, passed through to the handler unmodified
    args: serde_json::Value,
    /// How many attempts have failed so far
    error_count: i32,
    /// If error_count > 0, why did it fail last ?
    last_error: Option<String>,
}
