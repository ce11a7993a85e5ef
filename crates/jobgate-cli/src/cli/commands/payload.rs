//! `jobgate payload <id>` – print a job's payload.

use anyhow::Result;
use jobgate_core::job::JobId;
use jobgate_core::registry::{JobRegistry, RemoteRegistry};
use std::sync::Arc;

use super::blocking;

pub async fn run_payload(registry: Arc<RemoteRegistry>, id: JobId) -> Result<()> {
    let payload = blocking(move || Ok(registry.get_job(id)?.payload)).await?;
    match payload {
        Some(p) => println!("{p}"),
        None => eprintln!("job {id} has no payload"),
    }
    Ok(())
}
