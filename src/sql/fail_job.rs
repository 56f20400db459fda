use std::time::Duration;

use indoc::indoc;
use sqlx::{query, PgExecutor};

use crate::errors::Result;
use crate::job::Job;

/// Records a failed attempt and reschedules the job.
///
/// Bumps `error_count`, stores the failure description, and pushes
/// `run_at` to `now() + retry_in` so the row becomes claimable again once
/// the backoff delay has elapsed. `run_at` is part of the primary key, so
/// the predicate matches on the pre-update value.
pub async fn fail_job<'e>(
    executor: impl PgExecutor<'e>,
    job: &Job,
    message: &str,
    retry_in: Duration,
) -> Result<()> {
    let sql = indoc! {r#"
        update que_jobs
        set error_count = error_count + 1,
            run_at      = now() + $1::bigint * '1 second'::interval,
            last_error  = $2::text
        where queue = $3::text
        and priority = $4::smallint
        and run_at = $5::timestamptz
        and job_id = $6::bigint
    "#};

    query(sql)
        .bind(retry_in.as_secs() as i64)
        .bind(message)
        .bind(job.queue())
        .bind(job.priority())
        .bind(job.run_at())
        .bind(job.id())
        .execute(executor)
        .await?;

    Ok(())
}
