//! Aggregate outcome of waiting on a set of jobs.

use crate::job::{JobId, JobStatus};

/// Last observed status of every awaited job, in the order they were added.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BarrierResult {
    statuses: Vec<(JobId, JobStatus)>,
    timed_out: bool,
}

impl BarrierResult {
    pub(crate) fn new(statuses: Vec<(JobId, JobStatus)>, timed_out: bool) -> Self {
        Self {
            statuses,
            timed_out,
        }
    }

    /// True iff every job ended `FINISHED` before any deadline.
    pub fn is_success(&self) -> bool {
        !self.timed_out && self.statuses.iter().all(|(_, s)| *s == JobStatus::Finished)
    }

    pub fn timed_out(&self) -> bool {
        self.timed_out
    }

    pub fn statuses(&self) -> &[(JobId, JobStatus)] {
        &self.statuses
    }

    pub fn status(&self, id: JobId) -> Option<JobStatus> {
        self.statuses
            .iter()
            .find(|(job_id, _)| *job_id == id)
            .map(|(_, s)| *s)
    }

    /// Jobs that had not terminated when the wait ended.
    pub fn outstanding(&self) -> Vec<JobId> {
        self.ids_where(|s| !s.is_terminated())
    }

    /// Jobs that terminated without finishing (failed, cancelled or deleted).
    pub fn unsuccessful(&self) -> Vec<JobId> {
        self.ids_where(|s| s.is_terminated() && s != JobStatus::Finished)
    }

    fn ids_where(&self, pred: impl Fn(JobStatus) -> bool) -> Vec<JobId> {
        self.statuses
            .iter()
            .filter(|(_, s)| pred(*s))
            .map(|(id, _)| *id)
            .collect()
    }
}
