//! Job registry collaborator.
//!
//! The registry is the single source of truth for job state and per-node
//! load counters. This crate only issues the calls below against it; two
//! implementations are provided: [`InMemoryRegistry`] for embedding and
//! tests, and [`RemoteRegistry`] which talks to a registry over HTTP.

mod error;
mod memory;
mod remote;

use serde::{Deserialize, Serialize};

use crate::job::{Job, JobId, JobStatus};

pub use error::RegistryError;
pub use memory::InMemoryRegistry;
pub use remote::{HttpResponse, RemoteRegistry};

/// Load figures for one node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeLoad {
    pub host: String,
    /// Load currently placed on the node.
    #[serde(default)]
    pub current_load: f32,
    /// Configured maximum load for the node.
    pub max_load: f32,
}

/// Calls the core issues against the job registry.
///
/// Every call may fail with [`RegistryError::Communication`]; callers
/// propagate it unless they explicitly fold "not found" into an empty result.
pub trait JobRegistry: Send + Sync {
    /// Latest stored version of the job.
    fn get_job(&self, id: JobId) -> Result<Job, RegistryError>;

    /// Persists `job`; returns the registry's updated copy (new version, timestamps).
    fn update_job(&self, job: &Job) -> Result<Job, RegistryError>;

    /// Number of jobs of `job_type` currently in `status`.
    fn count(&self, job_type: &str, status: JobStatus) -> Result<u64, RegistryError>;

    /// Load currently placed on the node this registry client lives on.
    fn own_load(&self) -> Result<f32, RegistryError>;

    fn max_load_on_node(&self, host: &str) -> Result<NodeLoad, RegistryError>;

    /// Hostname under which this node is known to the registry.
    fn registry_hostname(&self) -> Result<String, RegistryError>;
}

impl<R: JobRegistry + ?Sized> JobRegistry for std::sync::Arc<R> {
    fn get_job(&self, id: JobId) -> Result<Job, RegistryError> {
        (**self).get_job(id)
    }

    fn update_job(&self, job: &Job) -> Result<Job, RegistryError> {
        (**self).update_job(job)
    }

    fn count(&self, job_type: &str, status: JobStatus) -> Result<u64, RegistryError> {
        (**self).count(job_type, status)
    }

    fn own_load(&self) -> Result<f32, RegistryError> {
        (**self).own_load()
    }

    fn max_load_on_node(&self, host: &str) -> Result<NodeLoad, RegistryError> {
        (**self).max_load_on_node(host)
    }

    fn registry_hostname(&self) -> Result<String, RegistryError> {
        (**self).registry_hostname()
    }
}
