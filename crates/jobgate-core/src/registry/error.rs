//! Registry error taxonomy.

use thiserror::Error;

use crate::job::{JobId, TransitionError, WireError};

/// Errors surfaced by a [`JobRegistry`](super::JobRegistry) implementation.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// The registry could not be reached or answered with an unexpected status.
    #[error("registry communication failed: {message}")]
    Communication {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("job not found: {0}")]
    NotFound(JobId),

    #[error("host not registered: {0}")]
    HostNotFound(String),

    /// The registry refused an update (stale version or disallowed transition).
    #[error("registry rejected update of job {job_id}: {reason}")]
    Conflict { job_id: JobId, reason: String },

    #[error("could not decode registry response: {0}")]
    Decode(#[from] WireError),

    #[error("unexpected registry response: {0}")]
    InvalidResponse(String),
}

impl RegistryError {
    pub fn communication(message: impl Into<String>) -> Self {
        RegistryError::Communication {
            message: message.into(),
            source: None,
        }
    }

    pub fn communication_with<E>(message: impl Into<String>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        RegistryError::Communication {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, RegistryError::NotFound(_))
    }
}

impl From<TransitionError> for RegistryError {
    fn from(e: TransitionError) -> Self {
        RegistryError::Conflict {
            job_id: e.job_id,
            reason: e.to_string(),
        }
    }
}
