use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::{Duration, Instant};

use getset::Getters;
use que_worker_shutdown_signal::ShutdownSignal;
use sqlx::PgPool;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::backoff::Backoff;
use crate::client::{Client, LockedJob};
use crate::errors::QueWorkerError;
use crate::job::Job;

/// Type alias for job handler functions.
///
/// A handler takes a [`WorkerContext`] and returns a future resolving to
/// `Result<(), String>`; the string is the failure description recorded on
/// the job row. Use [`WorkerPoolOptions::define_job`] for typed handlers
/// that deserialize their args automatically.
///
/// [`WorkerPoolOptions::define_job`]: crate::WorkerPoolOptions::define_job
pub type WorkerFn = Box<
    dyn Fn(WorkerContext) -> Pin<Box<dyn Future<Output = Result<(), String>> + Send>> + Send + Sync,
>;

/// The dispatch table: job type name to handler function. Built by the
/// caller through the pool options, consumed read-only by every worker.
pub type WorkMap = HashMap<String, WorkerFn>;

/// Everything a handler gets to see: the claimed job (including its raw
/// JSON args) and the shared pool for enqueueing follow-up jobs.
///
/// The pool handed out here is the shared one, not the claimed job's
/// session; handlers never touch the connection that holds the lock.
#[derive(Clone, Getters)]
#[getset(get = "pub")]
pub struct WorkerContext {
    pg_pool: PgPool,
    job: Job,
}

impl WorkerContext {
    pub(crate) fn new(pg_pool: PgPool, job: Job) -> Self {
        WorkerContext { pg_pool, job }
    }
}

/// A single worker loop: repeatedly claim a job, dispatch it to its
/// handler, resolve the row, release the lock.
///
/// Workers are fully independent of each other; they share only the
/// read-only dispatch table and the connection pool.
#[derive(Getters)]
#[getset(get = "pub")]
pub struct Worker {
    worker_id: String,
    queue: String,
    poll_interval: Duration,
    #[getset(skip)]
    jobs: Arc<WorkMap>,
    #[getset(skip)]
    client: Client,
    #[getset(skip)]
    backoff: Backoff,
    #[getset(skip)]
    shutdown_signal: ShutdownSignal,
}

/// Errors that can occur during the execution of a job's handler. All of
/// them resolve the job as failed; none of them terminate the worker.
#[derive(Error, Debug)]
enum RunJobError {
    /// The job's type has no entry in the dispatch table
    #[error("unknown job type: {0:?}")]
    UnknownJobType(String),
    /// The handler panicked; the panic was recovered by the runtime
    #[error("job handler panicked: {0}")]
    HandlerPanic(#[from] tokio::task::JoinError),
    /// The handler returned an error string
    #[error("{0}")]
    HandlerError(String),
}

/// Error that occurs when resolving a job (delete or reschedule) fails.
#[derive(Error, Debug)]
#[error("Failed to release job '{job_id}'. {source}")]
pub struct ReleaseJobError {
    job_id: i64,
    #[source]
    source: QueWorkerError,
}

impl Worker {
    pub(crate) fn new(
        worker_id: String,
        queue: String,
        poll_interval: Duration,
        jobs: Arc<WorkMap>,
        client: Client,
        backoff: Backoff,
        shutdown_signal: ShutdownSignal,
    ) -> Self {
        Worker {
            worker_id,
            queue,
            poll_interval,
            jobs,
            client,
            backoff,
            shutdown_signal,
        }
    }

    /// Runs the worker loop until the shutdown signal is triggered.
    ///
    /// Eligible jobs are worked back to back; when none is available (or a
    /// claim attempt fails transiently) the worker sleeps for
    /// `poll_interval` before scanning again. Shutdown is observed between
    /// jobs and during the idle sleep, never mid-job: a claimed job always
    /// reaches the end of resolution, including the lock release, before
    /// the loop exits.
    pub async fn run(&self) {
        info!(
            worker_id = %self.worker_id,
            queue = %self.queue,
            "Worker started"
        );

        loop {
            if self.shutdown_signal.is_triggered() {
                break;
            }

            if self.work_one().await {
                continue;
            }

            tokio::select! {
                _ = tokio::time::sleep(self.poll_interval) => {}
                _ = self.shutdown_signal.triggered() => break,
            }
        }

        info!(worker_id = %self.worker_id, "Worker stopped");
    }

    /// Claims and processes at most one job. Returns whether any work was
    /// done; claim errors are reported and treated like an empty scan so
    /// the caller backs off instead of spinning.
    pub async fn work_one(&self) -> bool {
        let locked = match self.client.lock_job(&self.queue).await {
            Ok(Some(locked)) => locked,
            Ok(None) => return false,
            Err(e) => {
                error!(
                    worker_id = %self.worker_id,
                    error = ?e,
                    "Could not lock job"
                );
                return false;
            }
        };

        let job_result = self.run_job(locked.job()).await;
        if let Err(e) = self.release_job(locked, job_result).await {
            error!(worker_id = %self.worker_id, error = ?e, "Could not release job");
        }

        true
    }

    /// Looks up the job's handler and executes it.
    ///
    /// The handler future runs on its own task so a panic is confined to
    /// that task and comes back as a `JoinError` instead of unwinding
    /// through the worker loop.
    async fn run_job(&self, job: &Job) -> Result<(), RunJobError> {
        let job_fn = self
            .jobs
            .get(job.job_type())
            .ok_or_else(|| RunJobError::UnknownJobType(job.job_type().clone()))?;

        debug!(
            worker_id = %self.worker_id,
            job_id = job.id(),
            job_type = %job.job_type(),
            "Found job"
        );

        let ctx = WorkerContext::new(self.client.pg_pool().clone(), job.clone());
        let job_fut = job_fn(ctx);

        let start = Instant::now();
        tokio::spawn(job_fut)
            .await?
            .map_err(RunJobError::HandlerError)?;
        let duration = start.elapsed().as_millis();

        info!(
            worker_id = %self.worker_id,
            job_id = job.id(),
            job_type = %job.job_type(),
            duration,
            "Completed job with success"
        );

        Ok(())
    }

    /// Resolves the claimed job: deletes the row on success, or records the
    /// failure and reschedules it with backoff. Both paths release the
    /// advisory lock as their final step.
    async fn release_job(
        &self,
        locked: LockedJob,
        job_result: Result<(), RunJobError>,
    ) -> Result<(), ReleaseJobError> {
        let job_id = *locked.job().id();

        let result = match job_result {
            Ok(()) => locked.complete().await,
            Err(e) => {
                let message = e.to_string();
                let error_count = locked.job().error_count() + 1;
                let retry_in = (self.backoff)(error_count);

                warn!(
                    worker_id = %self.worker_id,
                    job_id,
                    job_type = %locked.job().job_type(),
                    error = %message,
                    error_count,
                    retry_in_secs = retry_in.as_secs(),
                    "Failed job"
                );

                locked.fail(&message, retry_in).await
            }
        };

        result.map_err(|source| ReleaseJobError { job_id, source })
    }
}
