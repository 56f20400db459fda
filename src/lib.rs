//! A PostgreSQL-backed job queue that is fully interoperable with Ruby's
//! Que queueing library and its ports. Like Que, it uses session-scoped
//! advisory locks for speed and reliability: claiming a job never blocks
//! on row locks, and a worker process that dies releases its claims the
//! moment its connection drops, with no cleanup or heartbeat machinery.
//!
//! Because the `que_jobs` schema and locking protocol are shared, you can
//! enqueue jobs from a Rails app and work them here, or keep most workers
//! elsewhere and run just a few job types from Rust on a dedicated queue.
//!
//! Advisory locks are scoped to the database session that took them, so a
//! worker holds one and the same connection from claiming a job through
//! executing it, resolving it, and releasing the lock. [`Client::lock_job`]
//! checks a connection out of the shared [`sqlx::PgPool`] for exactly that
//! span; the pool is never asked to share it.
//!
//! # Usage
//!
//! ```no_run
//! use que_worker::{Client, JobSpec, WorkerContext, WorkerPool};
//! use serde::{Deserialize, Serialize};
//! use sqlx::postgres::PgPoolOptions;
//!
//! #[derive(Serialize, Deserialize)]
//! struct PrintName {
//!     name: String,
//! }
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let pg_pool = PgPoolOptions::new()
//!     .max_connections(4)
//!     .connect(&std::env::var("DATABASE_URL")?)
//!     .await?;
//!
//! // Run two workers on the "name_printer" queue.
//! let pool = WorkerPool::options()
//!     .pg_pool(pg_pool.clone())
//!     .concurrency(2)
//!     .queue("name_printer")
//!     .define_job("PrintName", |_ctx: WorkerContext, args: PrintName| async move {
//!         println!("Hello {}!", args.name);
//!         Ok::<(), String>(())
//!     })
//!     .init()
//!     .await?;
//!
//! // Enqueue one job now and one 30 seconds from now.
//! let client = Client::new(pg_pool);
//! client
//!     .enqueue("PrintName", PrintName { name: "que".into() }, JobSpec::default())
//!     .await?;
//! client
//!     .enqueue(
//!         "PrintName",
//!         PrintName { name: "later".into() },
//!         JobSpec::builder()
//!             .run_at(chrono::Utc::now() + chrono::Duration::seconds(30))
//!             .build(),
//!     )
//!     .await?;
//!
//! // Runs until request_shutdown() or an OS termination signal.
//! pool.run().await;
//! # Ok(())
//! # }
//! ```

mod backoff;
mod builder;
mod client;
pub mod errors;
mod job;
mod job_spec;
pub mod migrate;
mod pool;
mod sql;
mod worker;

pub use backoff::{default_backoff, Backoff};
pub use builder::{PoolBuildError, WorkerPoolOptions};
pub use client::{Client, LockedJob};
pub use job::Job;
pub use job_spec::{JobSpec, JobSpecBuilder, DEFAULT_PRIORITY, DEFAULT_QUEUE};
pub use pool::WorkerPool;
pub use worker::{ReleaseJobError, Worker, WorkerContext, WorkerFn, WorkMap};

pub use que_worker_shutdown_signal::ShutdownSignal;
