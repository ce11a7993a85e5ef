//! Stateless helpers over jobs and the registry.

use std::sync::Arc;
use std::time::Duration;

use crate::barrier::{BarrierError, BarrierResult, JobBarrier};
use crate::job::{self, Job, WireError};
use crate::registry::{HttpResponse, JobRegistry, RegistryError};

/// Sum of the queue times of `jobs`; jobs without one count as zero.
pub fn sum_queue_time<'a>(jobs: impl IntoIterator<Item = &'a Job>) -> Duration {
    let millis = jobs
        .into_iter()
        .map(|j| j.queue_time.unwrap_or(0))
        .fold(0u64, u64::saturating_add);
    Duration::from_millis(millis)
}

/// Jobs whose status is anything but `FINISHED`, failed and pending alike.
pub fn non_finished<'a>(jobs: impl IntoIterator<Item = &'a Job>) -> Vec<&'a Job> {
    jobs.into_iter()
        .filter(|j| j.status != job::JobStatus::Finished)
        .collect()
}

pub fn is_ready_to_dispatch(job: &Job) -> bool {
    job.status.is_ready_to_dispatch()
}

/// Latest payload of `job`, or `None` if the job is gone or has no payload.
pub fn fetch_payload<R>(registry: &R, job: &Job) -> Result<Option<String>, RegistryError>
where
    R: JobRegistry + ?Sized,
{
    Ok(refresh(registry, job)?.and_then(|j| j.payload))
}

/// Latest copy of `job` from the registry, or `None` if it no longer exists.
pub fn refresh<R>(registry: &R, job: &Job) -> Result<Option<Job>, RegistryError>
where
    R: JobRegistry + ?Sized,
{
    match registry.get_job(job.id) {
        Ok(latest) => Ok(Some(latest)),
        Err(e) if e.is_not_found() => Ok(None),
        Err(e) => Err(e),
    }
}

/// Waits for a single job. See [`JobBarrier`].
pub fn wait_for_job<R>(
    registry: Arc<R>,
    poll_interval: Duration,
    timeout: Option<Duration>,
    job: &Job,
) -> Result<BarrierResult, BarrierError>
where
    R: JobRegistry + ?Sized + 'static,
{
    let mut barrier = JobBarrier::new(registry, poll_interval, [job]);
    if let Some(timeout) = timeout {
        barrier = barrier.with_timeout(timeout);
    }
    barrier.wait_for_jobs()
}

/// Reusable check that waits for the given job and reports whether it finished.
/// Registry errors count as failure.
pub fn wait_for_job_success<R>(
    registry: Arc<R>,
    poll_interval: Duration,
    timeout: Option<Duration>,
) -> impl Fn(&Job) -> bool
where
    R: JobRegistry + ?Sized + 'static,
{
    move |job: &Job| match wait_for_job(Arc::clone(&registry), poll_interval, timeout, job) {
        Ok(result) => result.is_success(),
        Err(e) => {
            tracing::warn!(job_id = job.id, error = %e, "waiting for job failed");
            false
        }
    }
}

/// Job carried in a registry response body, if the response has one.
///
/// Status codes are not interpreted beyond "is there an entity": 204 and
/// empty bodies yield `None`, error statuses too.
pub fn job_from_http_response(response: &HttpResponse) -> Result<Option<Job>, WireError> {
    if !response.has_entity() {
        return Ok(None);
    }
    job::parse_job(response.body_str()).map(Some)
}
