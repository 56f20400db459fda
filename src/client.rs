use std::time::Duration;

use getset::Getters;
use serde::Serialize;
use sqlx::pool::PoolConnection;
use sqlx::{PgPool, Postgres};
use tracing::warn;

use crate::errors::Result;
use crate::job::Job;
use crate::job_spec::JobSpec;
use crate::sql::complete_job::complete_job;
use crate::sql::fail_job::fail_job;
use crate::sql::insert_job::insert_job;
use crate::sql::lock_job::{check_job, lock_job, unlock_job};

/// Enqueues jobs and claims them for processing.
///
/// A `Client` is cheap to clone; it shares the underlying connection pool.
/// Enqueueing borrows a pooled connection per call. Claiming checks one
/// connection out for the whole lifetime of the returned [`LockedJob`],
/// because the advisory lock only exists on the session that acquired it.
#[derive(Clone, Getters)]
#[getset(get = "pub")]
pub struct Client {
    pg_pool: PgPool,
}

impl Client {
    pub fn new(pg_pool: PgPool) -> Self {
        Client { pg_pool }
    }

    /// Inserts a job, serializing `args` to JSON first.
    ///
    /// Serialization errors and store rejections surface synchronously;
    /// nothing is retried. Returns the stored row with its assigned id and
    /// resolved defaults.
    pub async fn enqueue(
        &self,
        job_type: &str,
        args: impl Serialize,
        spec: JobSpec,
    ) -> Result<Job> {
        let args = serde_json::to_value(args)?;
        self.enqueue_raw(job_type, args, spec).await
    }

    /// Inserts a job whose args are already a JSON value, passed through
    /// unmodified.
    pub async fn enqueue_raw(
        &self,
        job_type: &str,
        args: serde_json::Value,
        spec: JobSpec,
    ) -> Result<Job> {
        insert_job(&self.pg_pool, job_type, &args, &spec).await
    }

    /// Attempts to claim one ready job from `queue`.
    ///
    /// Returns `Ok(None)` when no eligible, unclaimed job exists right now;
    /// that is the normal empty outcome, not an error. On success the
    /// returned [`LockedJob`] holds the session advisory lock for the
    /// job's id and owns the connection that acquired it.
    pub async fn lock_job(&self, queue: &str) -> Result<Option<LockedJob>> {
        let mut conn = self.pg_pool.acquire().await?;

        let Some(job) = lock_job(&mut conn, queue).await? else {
            return Ok(None);
        };

        // The scan's snapshot may predate another worker's delete of this
        // row; since we now hold the lock, a missing row means the job was
        // already finished.
        if !check_job(&mut conn, &job).await? {
            if !unlock_job(&mut conn, *job.id()).await? {
                warn!(job_id = job.id(), "Advisory lock was not held on release");
            }
            return Ok(None);
        }

        Ok(Some(LockedJob {
            conn: Some(conn),
            job,
        }))
    }
}

/// A claimed job, together with the database session that holds its
/// advisory lock.
///
/// The claim lives exactly as long as the session: resolve it with
/// [`complete`](LockedJob::complete) or [`fail`](LockedJob::fail) (both
/// release the lock as their final step), or give it back unresolved with
/// [`release`](LockedJob::release). If a `LockedJob` is dropped without
/// any of these, the connection is closed instead of being returned to the
/// pool — a pooled session would keep the lock alive indefinitely, while a
/// disconnect releases it on the server.
pub struct LockedJob {
    conn: Option<PoolConnection<Postgres>>,
    job: Job,
}

impl LockedJob {
    pub fn job(&self) -> &Job {
        &self.job
    }

    /// Resolves the job as succeeded: deletes the row, then releases the
    /// lock.
    pub async fn complete(mut self) -> Result<()> {
        let conn = self.conn.as_mut().expect("connection held until resolved");
        let result = complete_job(&mut **conn, &self.job).await;
        self.unlock().await;
        result
    }

    /// Resolves the job as failed: bumps `error_count`, records `message`
    /// as `last_error`, reschedules the row `retry_in` from now, then
    /// releases the lock.
    pub async fn fail(mut self, message: &str, retry_in: Duration) -> Result<()> {
        let conn = self.conn.as_mut().expect("connection held until resolved");
        let result = fail_job(&mut **conn, &self.job, message, retry_in).await;
        self.unlock().await;
        result
    }

    /// Releases the claim without touching the row, leaving the job
    /// immediately claimable by any worker.
    pub async fn release(mut self) {
        self.unlock().await;
    }

    /// Releases the advisory lock and returns the connection to the pool.
    ///
    /// Runs unconditionally at the end of every resolve path: a leaked
    /// lock starves the job until the session disconnects. If the unlock
    /// itself fails, the session may still hold the lock, so the
    /// connection is closed rather than pooled, which bounds the damage to
    /// this session's lifetime.
    async fn unlock(&mut self) {
        let Some(mut conn) = self.conn.take() else {
            return;
        };

        match unlock_job(&mut conn, *self.job.id()).await {
            Ok(true) => {}
            Ok(false) => {
                warn!(job_id = self.job.id(), "Advisory lock was not held on release");
            }
            Err(e) => {
                warn!(
                    job_id = self.job.id(),
                    error = ?e,
                    "Could not release advisory lock, closing the session instead"
                );
                drop(conn.detach());
            }
        }
    }
}

impl Drop for LockedJob {
    fn drop(&mut self) {
        // Abandoned claim: the session still holds the advisory lock, so
        // closing the connection (rather than pooling it) lets the server
        // release the lock.
        if let Some(conn) = self.conn.take() {
            drop(conn.detach());
        }
    }
}
