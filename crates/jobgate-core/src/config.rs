use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Retry policy for registry HTTP calls (optional section in config.toml).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of attempts per request (including the first).
    pub max_attempts: u32,
    /// Base delay in seconds for exponential backoff (e.g. 0.25 = 250ms).
    pub base_delay_secs: f64,
    /// Maximum backoff delay in seconds.
    pub max_delay_secs: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay_secs: 0.25,
            max_delay_secs: 30,
        }
    }
}

/// Node configuration loaded from `~/.config/jobgate/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobgateConfig {
    /// Base URL of the job registry service.
    pub registry_url: String,
    /// Hostname this node is registered under.
    pub node_hostname: String,
    /// Admit jobs whose declared load alone meets or exceeds the node's max load.
    #[serde(default)]
    pub accept_oversize_jobs: bool,
    /// Barrier poll interval in milliseconds.
    pub poll_interval_ms: u64,
    /// Optional default deadline for barrier waits, in seconds (None = wait indefinitely).
    #[serde(default)]
    pub wait_timeout_secs: Option<u64>,
    /// Per-request HTTP timeout in seconds.
    pub request_timeout_secs: u64,
    /// Optional retry policy; if missing, built-in defaults are used.
    #[serde(default)]
    pub retry: Option<RetryConfig>,
}

impl Default for JobgateConfig {
    fn default() -> Self {
        Self {
            registry_url: "http://localhost:8080/services".to_string(),
            node_hostname: "http://localhost:8080".to_string(),
            accept_oversize_jobs: false,
            poll_interval_ms: 500,
            wait_timeout_secs: None,
            request_timeout_secs: 30,
            retry: None,
        }
    }
}

impl JobgateConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn wait_timeout(&self) -> Option<Duration> {
        self.wait_timeout_secs.map(Duration::from_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }

    pub fn retry_config(&self) -> RetryConfig {
        self.retry.clone().unwrap_or_default()
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("jobgate")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<JobgateConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = JobgateConfig::default();
        save_to_path(&default_cfg, &path)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }
    load_from_path(&path)
}

pub fn load_from_path(path: &Path) -> Result<JobgateConfig> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("read config: {}", path.display()))?;
    let cfg: JobgateConfig =
        toml::from_str(&data).with_context(|| format!("parse config: {}", path.display()))?;
    Ok(cfg)
}

pub fn save_to_path(cfg: &JobgateConfig, path: &Path) -> Result<()> {
    let toml = toml::to_string_pretty(cfg)?;
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, toml)?;
    Ok(())
}
