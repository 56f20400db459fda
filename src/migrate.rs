use indoc::indoc;
use sqlx::{query, PgExecutor};
use tracing::debug;

use crate::errors::Result;

/// The `que_jobs` table as the Que family of implementations defines it.
/// Column names, types and defaults are the interoperability contract:
/// a row enqueued by any implementation must be claimable by any other.
const CREATE_QUE_JOBS: &str = indoc! {r#"
    create table if not exists que_jobs (
        priority    smallint    not null default 100,
        run_at      timestamptz not null default now(),
        job_id      bigserial   not null,
        job_class   text        not null,
        args        json        not null default '[]'::json,
        error_count integer     not null default 0,
        last_error  text,
        queue       text        not null default '',
        constraint que_jobs_pkey primary key (queue, priority, run_at, job_id)
    )
"#};

/// Ensures the `que_jobs` table exists. Idempotent, and safe to run
/// against a database whose schema is already managed by another Que
/// implementation; no versioning ledger of our own is kept, since the
/// schema is jointly owned with those implementations.
pub async fn migrate<'e>(executor: impl PgExecutor<'e>) -> Result<()> {
    query(CREATE_QUE_JOBS).execute(executor).await?;
    debug!("Ensured que_jobs table exists");

    Ok(())
}
