//! CLI for inspecting, waiting on and probing admission of registry jobs.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use jobgate_core::config;
use jobgate_core::job::{JobId, JobStatus};
use jobgate_core::registry::RemoteRegistry;
use std::sync::Arc;

use commands::{run_admit, run_count, run_load, run_payload, run_show, run_wait, WaitOptions};

/// Top-level CLI for jobgate.
#[derive(Debug, Parser)]
#[command(name = "jobgate")]
#[command(about = "jobgate: load-aware job admission and completion tracking", long_about = None)]
pub struct Cli {
    /// Registry base URL (overrides `registry_url` from config.toml).
    #[arg(long, global = true, value_name = "URL")]
    pub registry: Option<String>,

    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Show a job as stored in the registry.
    Show {
        /// Job identifier.
        id: JobId,
    },

    /// Wait until the given jobs terminate. Exits with 2 if any did not finish.
    Wait {
        /// Job identifiers.
        #[arg(required = true)]
        ids: Vec<JobId>,
        /// Give up after SECS seconds (default: `wait_timeout_secs` from config, else no limit).
        #[arg(long, value_name = "SECS")]
        timeout: Option<u64>,
        /// Poll interval in milliseconds (default: `poll_interval_ms` from config).
        #[arg(long, value_name = "MS", value_parser = clap::value_parser!(u64).range(1..))]
        poll_ms: Option<u64>,
    },

    /// Print the payload of a job.
    Payload {
        /// Job identifier.
        id: JobId,
    },

    /// Show this node's current and maximum load.
    Load,

    /// Count jobs of a type in a given status.
    Count {
        /// Job type (e.g. "encode").
        job_type: String,
        /// Status, e.g. RUNNING or queued.
        status: JobStatus,
    },

    /// Check whether this node would admit a job of the given load right now.
    Admit {
        #[arg(long)]
        job_type: String,
        #[arg(long, value_name = "LOAD")]
        job_load: f32,
        /// Admit jobs that exceed the node's max load on their own.
        #[arg(long)]
        accept_oversize: bool,
    },
}

impl CliCommand {
    /// Parses arguments and runs the command. Returns the process exit code.
    pub async fn run_from_args() -> Result<i32> {
        let cli = Cli::parse();
        let mut cfg = config::load_or_init()?;
        if let Some(url) = cli.registry {
            cfg.registry_url = url;
        }
        tracing::debug!("loaded config: {:?}", cfg);
        let registry = Arc::new(RemoteRegistry::from_config(&cfg)?);

        match cli.command {
            CliCommand::Show { id } => run_show(registry, id).await?,
            CliCommand::Wait {
                ids,
                timeout,
                poll_ms,
            } => {
                let opts = WaitOptions {
                    poll_interval: poll_ms
                        .map(std::time::Duration::from_millis)
                        .unwrap_or_else(|| cfg.poll_interval()),
                    timeout: timeout
                        .map(std::time::Duration::from_secs)
                        .or_else(|| cfg.wait_timeout()),
                };
                return run_wait(registry, ids, opts).await;
            }
            CliCommand::Payload { id } => run_payload(registry, id).await?,
            CliCommand::Load => run_load(registry).await?,
            CliCommand::Count { job_type, status } => run_count(registry, job_type, status).await?,
            CliCommand::Admit {
                job_type,
                job_load,
                accept_oversize,
            } => {
                run_admit(
                    registry,
                    job_type,
                    job_load,
                    accept_oversize || cfg.accept_oversize_jobs,
                )
                .await?
            }
        }

        Ok(0)
    }
}

#[cfg(test)]
mod tests;
