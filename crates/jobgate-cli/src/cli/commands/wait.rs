//! `jobgate wait <id>...` – block until jobs terminate.

use anyhow::Result;
use jobgate_core::barrier::JobBarrier;
use jobgate_core::job::JobId;
use jobgate_core::registry::RemoteRegistry;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone, Copy)]
pub struct WaitOptions {
    pub poll_interval: Duration,
    pub timeout: Option<Duration>,
}

/// Returns exit code 0 when every job finished, 2 otherwise.
pub async fn run_wait(
    registry: Arc<RemoteRegistry>,
    ids: Vec<JobId>,
    opts: WaitOptions,
) -> Result<i32> {
    let mut barrier = JobBarrier::for_ids(registry, opts.poll_interval, ids);
    if let Some(timeout) = opts.timeout {
        barrier = barrier.with_timeout(timeout);
    }
    let result = barrier.wait_off_thread().await?;

    for (id, status) in result.statuses() {
        println!("{:<8} {}", id, status);
    }
    if result.timed_out() {
        let outstanding: Vec<String> = result.outstanding().iter().map(|id| id.to_string()).collect();
        eprintln!("timed out; still waiting on {}", outstanding.join(", "));
    }
    Ok(if result.is_success() { 0 } else { 2 })
}
