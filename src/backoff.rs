use std::sync::Arc;
use std::time::Duration;

/// Policy computing the retry delay after a failed attempt, as a function
/// of the accumulated failure count (including the attempt that just
/// failed, so the first input is 1).
pub type Backoff = Arc<dyn Fn(i32) -> Duration + Send + Sync>;

/// The retry schedule used when no policy is configured:
/// `error_count^4 + 3` seconds.
///
/// This is the schedule the other Que implementations use, so mixed worker
/// fleets reschedule failed jobs identically: 4s, 19s, 84s, 259s, ... with
/// no upper cap (capping and dead-lettering are caller-level policy on top
/// of `error_count`).
pub fn default_backoff(error_count: i32) -> Duration {
    let n = u64::from(error_count.unsigned_abs());
    Duration::from_secs(n.saturating_pow(4).saturating_add(3))
}
