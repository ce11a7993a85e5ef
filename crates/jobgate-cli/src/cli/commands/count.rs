//! `jobgate count <job-type> <status>` – count jobs in a status.

use anyhow::Result;
use jobgate_core::job::JobStatus;
use jobgate_core::registry::{JobRegistry, RemoteRegistry};
use std::sync::Arc;

use super::blocking;

pub async fn run_count(
    registry: Arc<RemoteRegistry>,
    job_type: String,
    status: JobStatus,
) -> Result<()> {
    let n = blocking(move || Ok(registry.count(&job_type, status)?)).await?;
    println!("{n}");
    Ok(())
}
