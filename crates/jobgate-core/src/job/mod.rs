//! Job entity: one schedulable, trackable unit of work.
//!
//! The registry owns jobs; this crate only reads them, performs the single
//! producer-side `DISPATCHING -> RUNNING` transition, and records the
//! outcome of processing. Parent and root jobs are plain ids and are looked
//! up through the registry when needed.

mod status;
mod wire;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub use status::{JobStatus, UnknownStatus};
pub use wire::{parse_job, parse_job_list, to_json, WireError};

/// Job identifier assigned by the registry.
pub type JobId = i64;

/// Returned by [`Job::transition_to`] when the state machine has no such edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("illegal status transition for job {job_id}: {from} -> {to}")]
pub struct TransitionError {
    pub job_id: JobId,
    pub from: JobStatus,
    pub to: JobStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub id: JobId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creator: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organization: Option<String>,
    /// Optimistic-concurrency counter maintained by the registry.
    #[serde(default)]
    pub version: i64,
    pub job_type: String,
    pub operation: String,
    #[serde(default)]
    pub arguments: Vec<String>,
    pub status: JobStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_host: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub processing_host: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_created: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_started: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_completed: Option<DateTime<Utc>>,
    /// Milliseconds between creation and start (registry computed).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub queue_time: Option<u64>,
    /// Milliseconds between start and completion (registry computed).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_time: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_job_id: Option<JobId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root_job_id: Option<JobId>,
    #[serde(default)]
    pub dispatchable: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
    #[serde(default)]
    pub job_load: f32,
}

impl Job {
    /// A fresh, dispatchable job in `INSTANTIATED` with id 0 (the registry assigns the real id).
    pub fn new(job_type: impl Into<String>, operation: impl Into<String>) -> Self {
        Self {
            id: 0,
            creator: None,
            organization: None,
            version: 0,
            job_type: job_type.into(),
            operation: operation.into(),
            arguments: Vec::new(),
            status: JobStatus::Instantiated,
            created_host: None,
            processing_host: None,
            date_created: None,
            date_started: None,
            date_completed: None,
            queue_time: None,
            run_time: None,
            payload: None,
            parent_job_id: None,
            root_job_id: None,
            dispatchable: true,
            uri: None,
            job_load: 0.0,
        }
    }

    pub fn with_id(mut self, id: JobId) -> Self {
        self.id = id;
        self
    }

    pub fn with_status(mut self, status: JobStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_arguments<I, S>(mut self, arguments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.arguments = arguments.into_iter().map(Into::into).collect();
        self
    }

    /// Declared load; negative or NaN values are clamped to 0.
    pub fn with_job_load(mut self, job_load: f32) -> Self {
        self.job_load = sanitize_load(job_load);
        self
    }

    pub fn with_payload(mut self, payload: impl Into<String>) -> Self {
        self.payload = Some(payload.into());
        self
    }

    /// Links this job under `parent`; the root is inherited from the parent (or is the parent).
    pub fn with_parent(mut self, parent: &Job) -> Self {
        self.parent_job_id = Some(parent.id);
        self.root_job_id = Some(parent.root_job_id.unwrap_or(parent.id));
        self
    }

    pub fn dispatchable(mut self, dispatchable: bool) -> Self {
        self.dispatchable = dispatchable;
        self
    }

    pub fn is_terminated(&self) -> bool {
        self.status.is_terminated()
    }

    /// Moves the job to `next` if the state machine allows it.
    pub fn transition_to(&mut self, next: JobStatus) -> Result<(), TransitionError> {
        if !self.status.can_transition_to(next) {
            return Err(TransitionError {
                job_id: self.id,
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        Ok(())
    }
}

/// List of jobs as exchanged with the registry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobList {
    #[serde(default)]
    pub jobs: Vec<Job>,
}

pub(crate) fn sanitize_load(load: f32) -> f32 {
    if load.is_finite() {
        load.max(0.0)
    } else {
        0.0
    }
}
