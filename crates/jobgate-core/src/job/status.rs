//! Job status state machine.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Status of a job as tracked by the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    Instantiated,
    Queued,
    Dispatching,
    Running,
    Waiting,
    Finished,
    Failed,
    Cancelled,
    Deleted,
}

impl JobStatus {
    pub const ALL: [JobStatus; 9] = [
        JobStatus::Instantiated,
        JobStatus::Queued,
        JobStatus::Dispatching,
        JobStatus::Running,
        JobStatus::Waiting,
        JobStatus::Finished,
        JobStatus::Failed,
        JobStatus::Cancelled,
        JobStatus::Deleted,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Instantiated => "INSTANTIATED",
            JobStatus::Queued => "QUEUED",
            JobStatus::Dispatching => "DISPATCHING",
            JobStatus::Running => "RUNNING",
            JobStatus::Waiting => "WAITING",
            JobStatus::Finished => "FINISHED",
            JobStatus::Failed => "FAILED",
            JobStatus::Cancelled => "CANCELLED",
            JobStatus::Deleted => "DELETED",
        }
    }

    /// True for the statuses a job never leaves on its own:
    /// cancelled, deleted, failed and finished.
    pub const fn is_terminated(self) -> bool {
        matches!(
            self,
            JobStatus::Cancelled | JobStatus::Deleted | JobStatus::Failed | JobStatus::Finished
        )
    }

    /// A job is ready to be acted on by a worker only once the registry marked it running.
    pub const fn is_ready_to_dispatch(self) -> bool {
        matches!(self, JobStatus::Running)
    }

    /// Statuses whose job load counts against the processing host.
    pub const fn influences_load(self) -> bool {
        matches!(self, JobStatus::Dispatching | JobStatus::Running)
    }

    /// Whether the state machine has an edge `self -> next`.
    ///
    /// Staying in the same status is always allowed (updates that only touch
    /// other fields). `Deleted` is the one edge out of a terminal status: the
    /// registry reclaiming a finished, failed or cancelled job.
    pub fn can_transition_to(self, next: JobStatus) -> bool {
        use JobStatus::*;
        if self == next {
            return true;
        }
        matches!(
            (self, next),
            (Instantiated, Queued)
                | (Queued, Dispatching)
                | (Dispatching, Running)
                | (Running, Finished)
                | (Running, Failed)
                | (Running, Cancelled)
                | (Running, Waiting)
                | (Waiting, Running)
                | (Waiting, Cancelled)
                | (Waiting, Deleted)
                | (Finished, Deleted)
                | (Failed, Deleted)
                | (Cancelled, Deleted)
        )
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown status name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown job status: {0}")]
pub struct UnknownStatus(pub String);

impl FromStr for JobStatus {
    type Err = UnknownStatus;

    /// Case-insensitive; accepts the wire names (`RUNNING`) and lowercase CLI input.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_ascii_uppercase();
        JobStatus::ALL
            .into_iter()
            .find(|st| st.as_str() == upper)
            .ok_or_else(|| UnknownStatus(s.to_string()))
    }
}
