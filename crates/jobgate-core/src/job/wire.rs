//! JSON wire representation of jobs as served by the registry.

use super::{Job, JobList};

#[derive(Debug, thiserror::Error)]
pub enum WireError {
    #[error("malformed job JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("job {id} declares an invalid load {load}")]
    InvalidLoad { id: i64, load: f32 },
}

fn validate(job: &Job) -> Result<(), WireError> {
    if !job.job_load.is_finite() || job.job_load < 0.0 {
        return Err(WireError::InvalidLoad {
            id: job.id,
            load: job.job_load,
        });
    }
    Ok(())
}

/// Parses a single job. Accepts either a bare job object or one wrapped as `{"job": {...}}`.
pub fn parse_job(body: &str) -> Result<Job, WireError> {
    #[derive(serde::Deserialize)]
    #[serde(untagged)]
    enum Envelope {
        Wrapped { job: Job },
        Bare(Job),
    }

    let job = match serde_json::from_str::<Envelope>(body)? {
        Envelope::Wrapped { job } => job,
        Envelope::Bare(job) => job,
    };
    validate(&job)?;
    Ok(job)
}

pub fn parse_job_list(body: &str) -> Result<JobList, WireError> {
    let list: JobList = serde_json::from_str(body)?;
    for job in &list.jobs {
        validate(job)?;
    }
    Ok(list)
}

pub fn to_json(job: &Job) -> Result<String, WireError> {
    Ok(serde_json::to_string(job)?)
}
