use std::sync::Arc;

use getset::Getters;
use que_worker_shutdown_signal::ShutdownSignal;
use sqlx::PgPool;
use tokio::task::JoinSet;
use tracing::{error, info};

use crate::builder::WorkerPoolOptions;
use crate::client::Client;
use crate::worker::Worker;

/// A supervisor for N independent [`Worker`] loops bound to one queue and
/// one dispatch table.
///
/// Built through [`WorkerPool::options`]; preconditions (registered
/// handlers, reachable store) are checked there, so a constructed pool can
/// always run.
///
/// Each worker claims in `(priority, run_at, id)` order per scan, but with
/// several workers racing over the same queue there is no global execution
/// order: a lower-priority job can start before a higher-priority one when
/// a worker wins its lock first. Advisory locks mediate fairness, not a
/// global mutex.
#[derive(Getters)]
#[getset(get = "pub")]
pub struct WorkerPool {
    #[getset(skip)]
    workers: Vec<Arc<Worker>>,
    pg_pool: PgPool,
    shutdown_signal: ShutdownSignal,
}

impl WorkerPool {
    /// Creates a new [`WorkerPoolOptions`] builder with default settings.
    pub fn options() -> WorkerPoolOptions {
        WorkerPoolOptions::default()
    }

    pub(crate) fn new(
        workers: Vec<Arc<Worker>>,
        pg_pool: PgPool,
        shutdown_signal: ShutdownSignal,
    ) -> Self {
        WorkerPool {
            workers,
            pg_pool,
            shutdown_signal,
        }
    }

    /// An enqueue-capable client over the pool's shared connection source.
    pub fn client(&self) -> Client {
        Client::new(self.pg_pool.clone())
    }

    /// Runs every worker until the shutdown signal is triggered, then
    /// returns once all of them have exited.
    ///
    /// Shutdown is cooperative: each worker finishes resolving its current
    /// job (row deleted or rescheduled, lock released) before stopping; no
    /// in-flight job is abandoned mid-resolution.
    pub async fn run(&self) {
        info!(workers = self.workers.len(), "Worker pool started");

        let mut tasks = JoinSet::new();
        for worker in &self.workers {
            let worker = worker.clone();
            tasks.spawn(async move { worker.run().await });
        }

        while let Some(joined) = tasks.join_next().await {
            if let Err(e) = joined {
                error!(error = ?e, "Worker task ended abnormally");
            }
        }

        info!("Worker pool stopped");
    }

    /// Requests a graceful shutdown: workers finish their current job and
    /// exit, and [`run`](WorkerPool::run) returns once all have.
    pub fn request_shutdown(&self) {
        self.shutdown_signal.trigger();
    }
}
