//! Job producers: load-aware admission and execution of dispatched jobs.
//!
//! A [`JobProcessor`] supplies the job type it handles and the actual work.
//! [`JobProducer`] wraps it with the shared logic every producer needs:
//! admission control against the node's load, the `DISPATCHING -> RUNNING`
//! transition, and recording the outcome of processing in the registry.

mod admission;
mod dispatch;

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use thiserror::Error;

use crate::job::{Job, JobId, JobStatus, TransitionError};
use crate::registry::{JobRegistry, RegistryError};

pub use admission::{decide, Admission};
pub use dispatch::{dispatch_job, JobAcceptor};

/// Failure reported by [`JobProcessor::process`]. The job is marked `FAILED`.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct ProcessError {
    message: String,
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl ProcessError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    pub fn with_source<E>(message: impl Into<String>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }
}

#[derive(Debug, Error)]
pub enum ProducerError {
    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error("job {job_id} is {actual}, expected {expected}")]
    IllegalState {
        job_id: JobId,
        expected: JobStatus,
        actual: JobStatus,
    },

    #[error("producer for {expected:?} cannot run job {job_id} of type {actual:?}")]
    WrongJobType {
        job_id: JobId,
        expected: String,
        actual: String,
    },

    #[error(transparent)]
    Transition(#[from] TransitionError),

    #[error("could not start worker thread for job {job_id}")]
    Spawn {
        job_id: JobId,
        #[source]
        source: std::io::Error,
    },

    #[error("worker thread for job {0} panicked")]
    WorkerPanicked(JobId),
}

/// Job-type specific part of a producer.
pub trait JobProcessor: Send + Sync + 'static {
    /// Type of jobs this processor handles; fixed for its lifetime.
    fn job_type(&self) -> &str;

    /// Cheap readiness probe for `operation`, consulted before admission.
    fn is_ready_to_accept_jobs(&self, _operation: &str) -> bool {
        true
    }

    /// Does the work for `job`, which is `RUNNING` when this is called.
    /// The returned payload is stored on the job.
    fn process(&self, job: &Job) -> Result<Option<String>, ProcessError>;
}

/// Shared producer logic around a [`JobProcessor`].
#[derive(Debug)]
pub struct JobProducer<P, R> {
    processor: Arc<P>,
    registry: Arc<R>,
    accept_oversize_jobs: bool,
}

impl<P, R> JobProducer<P, R>
where
    P: JobProcessor,
    R: JobRegistry + 'static,
{
    /// Producer with the conservative admission policy (oversize jobs rejected).
    pub fn new(processor: P, registry: Arc<R>) -> Self {
        Self {
            processor: Arc::new(processor),
            registry,
            accept_oversize_jobs: false,
        }
    }

    pub fn with_accept_oversize_jobs(mut self, accept: bool) -> Self {
        self.accept_oversize_jobs = accept;
        self
    }

    pub fn set_accept_oversize_jobs(&mut self, accept: bool) {
        self.accept_oversize_jobs = accept;
    }

    pub fn accepts_oversize_jobs(&self) -> bool {
        self.accept_oversize_jobs
    }

    pub fn processor(&self) -> &P {
        &self.processor
    }

    pub fn job_type(&self) -> &str {
        self.processor.job_type()
    }

    pub fn is_ready_to_accept_jobs(&self, operation: &str) -> bool {
        self.processor.is_ready_to_accept_jobs(operation)
    }

    /// Number of jobs of this producer's type in `status`.
    pub fn count_jobs(&self, status: JobStatus) -> Result<u64, ProducerError> {
        Ok(self.registry.count(self.job_type(), status)?)
    }

    /// Runs the admission rule for `job` against the node's current load.
    ///
    /// Own load is read fresh on every call; concurrent checks may both pass.
    pub fn admission(&self, job: &Job) -> Result<Admission, ProducerError> {
        let host = self.registry.registry_hostname()?;
        let max_load = self.registry.max_load_on_node(&host)?.max_load;
        let own_load = self.registry.own_load()?;
        let admission = decide(own_load, job.job_load, max_load, self.accept_oversize_jobs);
        tracing::debug!(
            job_id = job.id,
            host = %host,
            own_load,
            job_load = job.job_load,
            max_load,
            accept_oversize = self.accept_oversize_jobs,
            decision = %admission,
            "admission check"
        );
        Ok(admission)
    }

    /// True when `job` may be accepted on this node. Registry errors are
    /// returned to the caller, who must treat them as a rejection.
    pub fn is_ready_to_accept(&self, job: &Job) -> Result<bool, ProducerError> {
        Ok(self.admission(job)?.is_accepted())
    }

    /// Moves a `DISPATCHING` job to `RUNNING`, persists it, and starts
    /// processing on a dedicated worker thread.
    ///
    /// On return `job` holds the registry's `RUNNING` copy.
    pub fn accept_job(&self, job: &mut Job) -> Result<RunningJob, ProducerError> {
        if job.job_type != self.job_type() {
            return Err(ProducerError::WrongJobType {
                job_id: job.id,
                expected: self.job_type().to_string(),
                actual: job.job_type.clone(),
            });
        }
        if job.status != JobStatus::Dispatching {
            return Err(ProducerError::IllegalState {
                job_id: job.id,
                expected: JobStatus::Dispatching,
                actual: job.status,
            });
        }

        let mut running = job.clone();
        running.transition_to(JobStatus::Running)?;
        *job = self.registry.update_job(&running)?;
        tracing::info!(job_id = job.id, job_type = %job.job_type, operation = %job.operation, "job accepted");

        let processor = Arc::clone(&self.processor);
        let registry = Arc::clone(&self.registry);
        let snapshot = job.clone();
        let handle = thread::Builder::new()
            .name(format!("jobgate-{}-{}", job.job_type, job.id))
            .spawn(move || run_job(processor.as_ref(), registry.as_ref(), snapshot))
            .map_err(|source| ProducerError::Spawn {
                job_id: job.id,
                source,
            })?;

        Ok(RunningJob {
            job_id: job.id,
            handle,
        })
    }
}

/// Handle to a job being processed on its worker thread.
#[derive(Debug)]
pub struct RunningJob {
    job_id: JobId,
    handle: JoinHandle<Result<Job, ProducerError>>,
}

impl RunningJob {
    pub fn job_id(&self) -> JobId {
        self.job_id
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Waits for the worker and returns the job as last stored in the registry.
    pub fn join(self) -> Result<Job, ProducerError> {
        self.handle
            .join()
            .map_err(|_| ProducerError::WorkerPanicked(self.job_id))?
    }
}

fn run_job<P, R>(processor: &P, registry: &R, job: Job) -> Result<Job, ProducerError>
where
    P: JobProcessor + ?Sized,
    R: JobRegistry + ?Sized,
{
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| processor.process(&job)))
        .unwrap_or_else(|_| Err(ProcessError::new("processor panicked")));
    let target = match &outcome {
        Ok(_) => JobStatus::Finished,
        Err(e) => {
            tracing::warn!(job_id = job.id, error = %e, "job processing failed");
            JobStatus::Failed
        }
    };

    // The worker is detached when its handle is dropped, so failures are logged here.
    record_outcome(registry, job.id, outcome.ok().flatten(), target).map_err(|e| {
        tracing::error!(job_id = job.id, status = %target, error = %e, "could not record job outcome");
        e
    })
}

fn record_outcome<R>(
    registry: &R,
    job_id: JobId,
    payload: Option<String>,
    target: JobStatus,
) -> Result<Job, ProducerError>
where
    R: JobRegistry + ?Sized,
{
    // Pick up changes made while processing (e.g. cancellation elsewhere).
    let mut current = registry.get_job(job_id)?;
    if current.is_terminated() {
        tracing::info!(job_id, status = %current.status, "job already terminated, outcome dropped");
        return Ok(current);
    }

    if target == JobStatus::Finished {
        current.payload = payload;
    }
    current.transition_to(target)?;
    let stored = registry.update_job(&current)?;
    tracing::info!(job_id, status = %stored.status, "job completed");
    Ok(stored)
}

#[cfg(test)]
mod tests;
