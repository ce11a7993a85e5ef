//! Handing queued jobs to the first producer that will take them.

use crate::job::{Job, JobStatus};
use crate::registry::JobRegistry;

use super::{JobProcessor, JobProducer, ProducerError, RunningJob};

/// Object-safe view of a producer, so producers of different processor
/// types can be offered the same job.
pub trait JobAcceptor: Send + Sync {
    fn job_type(&self) -> &str;
    fn is_ready_to_accept_jobs(&self, operation: &str) -> bool;
    fn is_ready_to_accept(&self, job: &Job) -> Result<bool, ProducerError>;
    fn accept_job(&self, job: &mut Job) -> Result<RunningJob, ProducerError>;
}

impl<P, R> JobAcceptor for JobProducer<P, R>
where
    P: JobProcessor,
    R: JobRegistry + 'static,
{
    fn job_type(&self) -> &str {
        JobProducer::job_type(self)
    }

    fn is_ready_to_accept_jobs(&self, operation: &str) -> bool {
        JobProducer::is_ready_to_accept_jobs(self, operation)
    }

    fn is_ready_to_accept(&self, job: &Job) -> Result<bool, ProducerError> {
        JobProducer::is_ready_to_accept(self, job)
    }

    fn accept_job(&self, job: &mut Job) -> Result<RunningJob, ProducerError> {
        JobProducer::accept_job(self, job)
    }
}

/// Offers a `QUEUED` job to `producers` in order.
///
/// The first producer of the right type whose readiness probe and admission
/// check both pass gets the job: it is moved to `DISPATCHING` in the registry
/// and accepted. Returns `Ok(None)` when nobody takes it; the job is left
/// untouched in that case. A failed admission check counts as a rejection.
pub fn dispatch_job<R>(
    registry: &R,
    producers: &[&dyn JobAcceptor],
    job: &mut Job,
) -> Result<Option<RunningJob>, ProducerError>
where
    R: JobRegistry + ?Sized,
{
    if job.status != JobStatus::Queued {
        return Err(ProducerError::IllegalState {
            job_id: job.id,
            expected: JobStatus::Queued,
            actual: job.status,
        });
    }
    if !job.dispatchable {
        tracing::debug!(job_id = job.id, "job is not dispatchable");
        return Ok(None);
    }

    let mut chosen = None;
    for producer in producers {
        if producer.job_type() != job.job_type || !producer.is_ready_to_accept_jobs(&job.operation) {
            continue;
        }
        match producer.is_ready_to_accept(job) {
            Ok(true) => {
                chosen = Some(*producer);
                break;
            }
            Ok(false) => {}
            Err(e) => {
                tracing::warn!(job_id = job.id, error = %e, "admission check failed, treating as rejected");
            }
        }
    }
    let Some(producer) = chosen else {
        tracing::debug!(job_id = job.id, job_type = %job.job_type, "no producer accepted job");
        return Ok(None);
    };

    let mut dispatching = job.clone();
    dispatching.transition_to(JobStatus::Dispatching)?;
    *job = registry.update_job(&dispatching)?;
    producer.accept_job(job).map(Some)
}
