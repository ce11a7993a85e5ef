//! `jobgate load` – show this node's load against its maximum.

use anyhow::Result;
use jobgate_core::registry::{JobRegistry, RemoteRegistry};
use std::sync::Arc;

use super::blocking;

pub async fn run_load(registry: Arc<RemoteRegistry>) -> Result<()> {
    let (node, own) = blocking(move || {
        let host = registry.registry_hostname()?;
        let node = registry.max_load_on_node(&host)?;
        let own = registry.own_load()?;
        Ok((node, own))
    })
    .await?;
    println!("{:<32} {:>8} {:>8}", "HOST", "LOAD", "MAX");
    println!("{:<32} {:>8.2} {:>8.2}", node.host, own, node.max_load);
    Ok(())
}
