use indoc::indoc;
use sqlx::{query, PgExecutor};

use crate::errors::Result;
use crate::job::Job;

/// Deletes a finished job row.
///
/// The predicate is the table's full primary key `(queue, priority,
/// run_at, job_id)`, matching the delete issued by the other Que
/// implementations.
pub async fn complete_job<'e>(executor: impl PgExecutor<'e>, job: &Job) -> Result<()> {
    let sql = indoc! {r#"
        delete from que_jobs
        where queue = $1::text
        and priority = $2::smallint
        and run_at = $3::timestamptz
        and job_id = $4::bigint
    "#};

    query(sql)
        .bind(job.queue())
        .bind(job.priority())
        .bind(job.run_at())
        .bind(job.id())
        .execute(executor)
        .await?;

    Ok(())
}
