use indoc::indoc;
use sqlx::{query_as, query_scalar, PgConnection};
use tracing::debug;

use crate::errors::Result;
use crate::job::Job;

/// Finds and exclusively claims one ready job, or none.
///
/// This is Que's `lock_job` scan, kept statement-for-statement compatible
/// so workers written against the other Que implementations contend
/// correctly with ours. The recursive CTE walks claimable rows in
/// `(priority, run_at, job_id)` order, attempting a non-blocking session
/// advisory lock on each candidate; the first row whose lock attempt
/// succeeds is returned and the scan stops. Candidates whose lock is held
/// by another session are skipped without blocking, and an exhausted scan
/// yields no row.
///
/// The lock is scoped to `conn`'s database session: it survives until
/// `unlock_job` on the same connection, or until the session disconnects.
pub async fn lock_job(conn: &mut PgConnection, queue: &str) -> Result<Option<Job>> {
    let sql = indoc! {r#"
        with recursive candidate as (
            select (j).*, pg_try_advisory_lock((j).job_id) as locked
            from (
                select j
                from que_jobs as j
                where queue = $1::text
                and run_at <= now()
                order by priority, run_at, job_id
                limit 1
            ) as t1
            union all (
                select (j).*, pg_try_advisory_lock((j).job_id) as locked
                from (
                    select (
                        select j
                        from que_jobs as j
                        where queue = $1::text
                        and run_at <= now()
                        and (priority, run_at, job_id) >
                            (candidate.priority, candidate.run_at, candidate.job_id)
                        order by priority, run_at, job_id
                        limit 1
                    ) as j
                    from candidate
                    where candidate.job_id is not null
                    limit 1
                ) as t1
            )
        )
        select queue, priority, run_at, job_id, job_class, args, error_count, last_error
        from candidate
        where locked
        limit 1
    "#};

    let job: Option<Job> = query_as(sql).bind(queue).fetch_optional(&mut *conn).await?;

    if job.is_none() {
        debug!(queue, "No job found");
    }

    Ok(job)
}

/// Re-checks that a freshly locked row still exists.
///
/// The scan's MVCC snapshot can predate another worker's delete: it may
/// surface a job that finished between snapshot and lock attempt. Holding
/// the advisory lock proves nobody is working the id now, so a missing row
/// means the job was already completed and the claim must be abandoned.
pub async fn check_job(conn: &mut PgConnection, job: &Job) -> Result<bool> {
    let sql = indoc! {r#"
        select job_id
        from que_jobs
        where queue = $1::text
        and priority = $2::smallint
        and run_at = $3::timestamptz
        and job_id = $4::bigint
    "#};

    let found: Option<i64> = query_scalar(sql)
        .bind(job.queue())
        .bind(job.priority())
        .bind(job.run_at())
        .bind(job.id())
        .fetch_optional(&mut *conn)
        .await?;

    Ok(found.is_some())
}

/// Releases the session advisory lock for a job id.
///
/// Returns whether the lock was actually held by this session; `false`
/// indicates a double release.
pub async fn unlock_job(conn: &mut PgConnection, job_id: i64) -> Result<bool> {
    let unlocked: bool = query_scalar("select pg_advisory_unlock($1::bigint)")
        .bind(job_id)
        .fetch_one(&mut *conn)
        .await?;

    Ok(unlocked)
}
