//! `jobgate admit` – run the admission check for a hypothetical job on this node.

use anyhow::Result;
use jobgate_core::job::Job;
use jobgate_core::producer::{JobProcessor, JobProducer, ProcessError};
use jobgate_core::registry::RemoteRegistry;
use std::sync::Arc;

use super::blocking;

/// Stands in for a real processor; only its job type matters for admission.
struct Probe {
    job_type: String,
}

impl JobProcessor for Probe {
    fn job_type(&self) -> &str {
        &self.job_type
    }

    fn process(&self, _job: &Job) -> Result<Option<String>, ProcessError> {
        Err(ProcessError::new("admission probe does not run jobs"))
    }
}

pub async fn run_admit(
    registry: Arc<RemoteRegistry>,
    job_type: String,
    job_load: f32,
    accept_oversize: bool,
) -> Result<()> {
    let job = Job::new(job_type.clone(), "probe").with_job_load(job_load);
    let producer =
        JobProducer::new(Probe { job_type }, registry).with_accept_oversize_jobs(accept_oversize);
    let admission = blocking(move || Ok(producer.admission(&job)?)).await?;
    println!("{admission}");
    Ok(())
}
