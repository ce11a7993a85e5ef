//! `jobgate show <id>` – print a job as stored in the registry.

use anyhow::{bail, Result};
use jobgate_core::job::{Job, JobId};
use jobgate_core::query;
use jobgate_core::registry::RemoteRegistry;
use std::sync::Arc;

use super::blocking;

pub async fn run_show(registry: Arc<RemoteRegistry>, id: JobId) -> Result<()> {
    let response = blocking(move || Ok(registry.fetch_job_response(id)?)).await?;
    if response.status == 404 {
        bail!("job {id} not found");
    }
    let Some(job) = query::job_from_http_response(&response)? else {
        bail!("registry answered HTTP {} without a job", response.status);
    };
    print_job(&job);
    Ok(())
}

fn opt<T: std::fmt::Display>(v: &Option<T>) -> String {
    v.as_ref().map(|v| v.to_string()).unwrap_or_else(|| "-".to_string())
}

fn print_job(job: &Job) {
    println!("{:<16} {}", "id", job.id);
    println!("{:<16} {}", "type", job.job_type);
    println!("{:<16} {}", "operation", job.operation);
    if !job.arguments.is_empty() {
        println!("{:<16} {}", "arguments", job.arguments.join(" "));
    }
    println!("{:<16} {}", "status", job.status);
    println!("{:<16} {}", "load", job.job_load);
    println!("{:<16} {}", "dispatchable", job.dispatchable);
    println!("{:<16} {}", "created host", opt(&job.created_host));
    println!("{:<16} {}", "processing host", opt(&job.processing_host));
    println!("{:<16} {}", "created", opt(&job.date_created));
    println!("{:<16} {}", "started", opt(&job.date_started));
    println!("{:<16} {}", "completed", opt(&job.date_completed));
    println!("{:<16} {}", "queue time (ms)", opt(&job.queue_time));
    println!("{:<16} {}", "run time (ms)", opt(&job.run_time));
    println!("{:<16} {}", "parent", opt(&job.parent_job_id));
    println!("{:<16} {}", "root", opt(&job.root_job_id));
}
