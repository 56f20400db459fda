use chrono::{DateTime, Utc};
use derive_builder::Builder;
use getset::Getters;

/// Priority assigned when a spec leaves it unset. Matches the `que_jobs`
/// column default, so rows inserted here sort identically to rows inserted
/// by the other Que implementations.
pub const DEFAULT_PRIORITY: i16 = 100;

/// Queue used when a spec leaves it unset.
pub const DEFAULT_QUEUE: &str = "";

/// Scheduling options for a job being enqueued.
///
/// Every field is optional; unset fields fall back to the `que_jobs`
/// column defaults (queue `""`, priority `100`, run_at `now()`), resolved
/// server-side so the stored row is indistinguishable from one enqueued by
/// another Que implementation.
///
/// ```
/// use que_worker::JobSpec;
/// use chrono::Utc;
///
/// let spec = JobSpec::builder()
///     .queue("emails")
///     .priority(10)
///     .run_at(Utc::now() + chrono::Duration::minutes(5))
///     .build();
/// ```
#[derive(Getters, Debug, Default, Clone, Builder)]
#[getset(get = "pub")]
#[builder(
    build_fn(private, name = "build_internal"),
    setter(strip_option),
    default,
    pattern = "owned"
)]
pub struct JobSpec {
    /// Queue the job belongs to; workers only claim jobs from their own queue.
    #[builder(setter(into))]
    queue: Option<String>,

    /// Claim order among eligible jobs is ascending, so lower means sooner.
    priority: Option<i16>,

    /// Earliest time the job may be claimed (instead of immediately).
    #[builder(setter(into))]
    run_at: Option<DateTime<Utc>>,
}

impl JobSpec {
    /// Equivalent to `JobSpec::default()`.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn builder() -> JobSpecBuilder {
        JobSpecBuilder::default()
    }
}

impl JobSpecBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn build(self) -> JobSpec {
        self.build_internal()
            .expect("There is a default value for all fields")
    }
}

impl From<Option<JobSpec>> for JobSpec {
    fn from(spec: Option<JobSpec>) -> Self {
        spec.unwrap_or_default()
    }
}
