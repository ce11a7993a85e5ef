//! Blocking wait for a set of jobs to reach a terminal status.
//!
//! The barrier polls the registry for each job that has not terminated yet,
//! sleeping the poll interval between rounds. A job ending in `FAILED`,
//! `CANCELLED` or `DELETED` makes the aggregate result unsuccessful but does
//! not end the wait; the remaining jobs are still awaited and reported.
//! A job id the registry does not know is an error.

mod clock;
mod result;

use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::job::{Job, JobId, JobStatus};
use crate::registry::{JobRegistry, RegistryError};

pub use clock::{Clock, ManualClock, SystemClock};
pub use result::BarrierResult;

/// Lower bound on the nap between polling rounds.
pub const MIN_POLL_INTERVAL: Duration = Duration::from_millis(10);

#[derive(Debug, Error)]
pub enum BarrierError {
    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error("barrier worker failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

pub struct JobBarrier<R: ?Sized> {
    registry: Arc<R>,
    poll_interval: Duration,
    /// Awaited jobs with the status known at construction, if any.
    jobs: Vec<(JobId, Option<JobStatus>)>,
    timeout: Option<Duration>,
    current_job: Option<JobId>,
    clock: Arc<dyn Clock>,
}

impl<R: ?Sized> std::fmt::Debug for JobBarrier<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobBarrier")
            .field("poll_interval", &self.poll_interval)
            .field("jobs", &self.jobs)
            .field("timeout", &self.timeout)
            .field("current_job", &self.current_job)
            .finish_non_exhaustive()
    }
}

impl<R> JobBarrier<R>
where
    R: JobRegistry + ?Sized + 'static,
{
    /// Barrier over already fetched jobs. A job given in a terminal status
    /// is not polled again.
    pub fn new<'a>(
        registry: Arc<R>,
        poll_interval: Duration,
        jobs: impl IntoIterator<Item = &'a Job>,
    ) -> Self {
        let mut barrier = Self::for_ids(registry, poll_interval, std::iter::empty());
        for job in jobs {
            barrier.add_job(job);
        }
        barrier
    }

    /// Barrier over job ids; every job is resolved through the registry.
    pub fn for_ids(
        registry: Arc<R>,
        poll_interval: Duration,
        ids: impl IntoIterator<Item = JobId>,
    ) -> Self {
        Self {
            registry,
            poll_interval,
            jobs: ids.into_iter().map(|id| (id, None)).collect(),
            timeout: None,
            current_job: None,
            clock: Arc::new(SystemClock),
        }
    }

    pub fn add_job(&mut self, job: &Job) {
        self.jobs.push((job.id, Some(job.status)));
    }

    pub fn add_job_id(&mut self, id: JobId) {
        self.jobs.push((id, None));
    }

    /// Stop waiting after `timeout`; the result then reports the outstanding jobs.
    /// A timeout past the clock's range means no limit.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Job on whose behalf the wait happens. Only recorded in logs.
    pub fn with_current_job(mut self, job_id: JobId) -> Self {
        self.current_job = Some(job_id);
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn job_ids(&self) -> Vec<JobId> {
        self.jobs.iter().map(|(id, _)| *id).collect()
    }

    /// Blocks until every job has terminated or the timeout elapsed.
    pub fn wait_for_jobs(&self) -> Result<BarrierResult, BarrierError> {
        let span = tracing::debug_span!(
            "job_barrier",
            current_job = ?self.current_job,
            jobs = self.jobs.len()
        );
        let _guard = span.enter();

        // A timeout too large to represent as an instant never expires.
        let deadline = self
            .timeout
            .and_then(|t| self.clock.now().checked_add(t));
        let mut observed = self.jobs.clone();
        loop {
            let mut pending = 0usize;
            for (id, status) in observed.iter_mut() {
                if status.is_some_and(JobStatus::is_terminated) {
                    continue;
                }
                let latest = self.registry.get_job(*id)?.status;
                if latest.is_terminated() {
                    tracing::debug!(job_id = *id, status = %latest, "awaited job terminated");
                } else {
                    pending += 1;
                }
                *status = Some(latest);
            }

            if pending == 0 {
                return Ok(Self::finish(observed, false));
            }

            let now = self.clock.now();
            let mut nap = self.poll_interval.max(MIN_POLL_INTERVAL);
            if let Some(deadline) = deadline {
                if now >= deadline {
                    tracing::warn!(pending, "timed out waiting for jobs");
                    return Ok(Self::finish(observed, true));
                }
                nap = nap.min(deadline - now);
            }
            tracing::trace!(pending, "waiting for jobs");
            self.clock.sleep(nap);
        }
    }

    /// Runs [`wait_for_jobs`](Self::wait_for_jobs) on tokio's blocking pool,
    /// keeping the async executor free while polling.
    pub async fn wait_off_thread(self) -> Result<BarrierResult, BarrierError> {
        tokio::task::spawn_blocking(move || self.wait_for_jobs()).await?
    }

    fn finish(observed: Vec<(JobId, Option<JobStatus>)>, timed_out: bool) -> BarrierResult {
        let statuses = observed
            .into_iter()
            .filter_map(|(id, status)| status.map(|s| (id, s)))
            .collect();
        BarrierResult::new(statuses, timed_out)
    }
}
