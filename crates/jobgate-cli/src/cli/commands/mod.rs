//! CLI command handlers, one file per command.
//!
//! Registry calls are blocking (curl), so handlers push them onto tokio's
//! blocking pool.

mod admit;
mod count;
mod load;
mod payload;
mod show;
mod wait;

use anyhow::{Context, Result};

pub use admit::run_admit;
pub use count::run_count;
pub use load::run_load;
pub use payload::run_payload;
pub use show::run_show;
pub use wait::{run_wait, WaitOptions};

async fn blocking<T, F>(f: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .context("registry task panicked")?
}
