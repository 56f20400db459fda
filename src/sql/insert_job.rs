use indoc::indoc;
use sqlx::{query_as, PgExecutor};
use tracing::info;

use crate::errors::Result;
use crate::job::Job;
use crate::job_spec::JobSpec;

/// Inserts a new job row.
///
/// Unset spec fields are resolved by the database (`coalesce` onto the
/// column defaults) rather than client-side, so the stored row matches what
/// any other Que implementation would have written for the same input.
pub async fn insert_job<'e>(
    executor: impl PgExecutor<'e>,
    job_type: &str,
    args: &serde_json::Value,
    spec: &JobSpec,
) -> Result<Job> {
    let sql = indoc! {r#"
        insert into que_jobs (queue, priority, run_at, job_class, args)
        values (
            coalesce($1::text, ''),
            coalesce($2::smallint, 100),
            coalesce($3::timestamptz, now()),
            $4::text,
            $5::json
        )
        returning queue, priority, run_at, job_id, job_class, args, error_count, last_error
    "#};

    let job: Job = query_as(sql)
        .bind(spec.queue())
        .bind(spec.priority())
        .bind(spec.run_at())
        .bind(job_type)
        .bind(args)
        .fetch_one(executor)
        .await?;

    info!(
        job_id = job.id(),
        job_type,
        queue = %job.queue(),
        "Job enqueued"
    );

    Ok(job)
}
