use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use que_worker::{JobSpec, WorkerContext};
use serde_json::json;
use tokio::task::spawn_local;
use tokio::time::Instant;

use crate::helpers::{with_test_db, StaticCounter};

mod helpers;

#[tokio::test]
async fn failed_job_is_rescheduled_with_backoff() {
    with_test_db(|test_db| async move {
        let pool = Arc::new(
            test_db
                .create_pool_options()
                // Deterministic, per-attempt growing delay: 30min, 60min, ...
                .backoff(|error_count| Duration::from_secs(1800 * error_count as u64))
                .define_job(
                    "flaky",
                    |_ctx: WorkerContext, _args: serde_json::Value| async move {
                        Err::<(), String>("boom".to_string())
                    },
                )
                .init()
                .await
                .expect("Failed to create worker pool"),
        );

        test_db
            .client()
            .enqueue_raw("flaky", json!({}), JobSpec::default())
            .await
            .expect("Failed to enqueue job");

        let pool_handle = spawn_local({
            let pool = pool.clone();
            async move { pool.run().await }
        });

        // First failure: error_count 1, rescheduled ~30min out
        let start = Instant::now();
        loop {
            let jobs = test_db.get_jobs().await;
            if jobs.len() == 1 && *jobs[0].error_count() == 1 {
                let job = &jobs[0];
                let last_error = job.last_error().clone().expect("last_error should be set");
                assert!(
                    last_error.contains("boom"),
                    "Unexpected last_error: {last_error}"
                );
                let delay = *job.run_at() - Utc::now();
                assert!(
                    delay > chrono::Duration::minutes(25),
                    "run_at should be pushed ~30min out, got {delay}"
                );
                break;
            }
            assert!(
                start.elapsed() < Duration::from_secs(5),
                "The job should have failed once by now: {jobs:?}"
            );
            tokio::time::sleep(Duration::from_millis(50)).await;
        }

        // Make it eligible again; the second failure must push further out
        test_db.make_jobs_run_now("flaky").await;

        let start = Instant::now();
        loop {
            let jobs = test_db.get_jobs().await;
            if jobs.len() == 1 && *jobs[0].error_count() == 2 {
                let delay = *jobs[0].run_at() - Utc::now();
                assert!(
                    delay > chrono::Duration::minutes(55),
                    "The second delay should be larger than the first, got {delay}"
                );
                break;
            }
            assert!(
                start.elapsed() < Duration::from_secs(5),
                "The job should have failed twice by now: {jobs:?}"
            );
            tokio::time::sleep(Duration::from_millis(50)).await;
        }

        pool.request_shutdown();
        tokio::time::timeout(Duration::from_secs(2), pool_handle)
            .await
            .expect("Pool did not shut down after request")
            .expect("Pool task panicked");
    })
    .await;
}

#[tokio::test]
async fn error_count_grows_by_one_per_attempt() {
    static ATTEMPTS: StaticCounter = StaticCounter::new();

    with_test_db(|test_db| async move {
        let pool = Arc::new(
            test_db
                .create_pool_options()
                .concurrency(1)
                // Immediate retries so several attempts happen quickly
                .backoff(|_| Duration::ZERO)
                .define_job(
                    "flaky",
                    |_ctx: WorkerContext, _args: serde_json::Value| async move {
                        let attempt = ATTEMPTS.increment().await;
                        Err::<(), String>(format!("attempt {attempt} failed"))
                    },
                )
                .init()
                .await
                .expect("Failed to create worker pool"),
        );

        test_db
            .client()
            .enqueue_raw("flaky", json!({}), JobSpec::default())
            .await
            .expect("Failed to enqueue job");

        let pool_handle = spawn_local({
            let pool = pool.clone();
            async move { pool.run().await }
        });

        let start = Instant::now();
        while ATTEMPTS.get().await < 3 {
            assert!(
                start.elapsed() < Duration::from_secs(5),
                "The job should have been retried several times"
            );
            tokio::time::sleep(Duration::from_millis(50)).await;
        }

        pool.request_shutdown();
        tokio::time::timeout(Duration::from_secs(2), pool_handle)
            .await
            .expect("Pool did not shut down after request")
            .expect("Pool task panicked");

        // The row is still there, never deleted, and counts every attempt
        let jobs = test_db.get_jobs().await;
        assert_eq!(jobs.len(), 1);
        let job = &jobs[0];
        assert!(*job.error_count() >= 3);
        assert_eq!(
            *job.error_count() as u32,
            ATTEMPTS.get().await,
            "error_count should match the number of failed attempts"
        );
        let last_error = job.last_error().clone().expect("last_error should be set");
        assert!(last_error.contains("failed"));
    })
    .await;
}
