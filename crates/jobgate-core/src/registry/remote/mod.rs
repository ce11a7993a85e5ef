//! Job registry client over HTTP.
//!
//! Endpoints, relative to the registry base URL:
//! - `GET job/{id}.json`, `PUT job/{id}.json`
//! - `GET count?serviceType=..&status=..`
//! - `GET ownload?host=..`
//! - `GET maxload?host=..`
//!
//! Transient failures (timeouts, connection errors, 429/5xx) are retried
//! here according to the configured [`RetryPolicy`]; everything above this
//! client sees either a result or a [`RegistryError`]. A retried `PUT` that
//! conflicts with its own earlier, already applied attempt counts as success.

mod http;

use std::time::Duration;
use url::Url;

use crate::config::JobgateConfig;
use crate::job::{self, Job, JobId, JobStatus};
use crate::retry::{classify_http_status, run_with_retry, RetryPolicy, TransportError};

use super::{JobRegistry, NodeLoad, RegistryError};

pub use http::HttpResponse;
use http::Method;

#[derive(Debug, Clone)]
pub struct RemoteRegistry {
    base: Url,
    hostname: String,
    timeout: Duration,
    retry: RetryPolicy,
}

impl RemoteRegistry {
    /// Client for the registry at `base_url`; this node is known as `hostname`.
    pub fn new(base_url: &str, hostname: impl Into<String>) -> Result<Self, RegistryError> {
        let mut base = Url::parse(base_url).map_err(|e| {
            RegistryError::communication_with(format!("invalid registry URL {base_url}"), e)
        })?;
        // Url::join replaces the last segment unless the base ends in a slash.
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        Ok(Self {
            base,
            hostname: hostname.into(),
            timeout: Duration::from_secs(30),
            retry: RetryPolicy::default(),
        })
    }

    pub fn from_config(cfg: &JobgateConfig) -> Result<Self, RegistryError> {
        Ok(Self::new(&cfg.registry_url, cfg.node_hostname.clone())?
            .with_timeout(cfg.request_timeout())
            .with_retry(RetryPolicy::from_config(&cfg.retry_config())))
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    pub(crate) fn endpoint(&self, path: &str, query: &[(&str, &str)]) -> Result<Url, RegistryError> {
        let mut url = self.base.join(path).map_err(|e| {
            RegistryError::communication_with(format!("invalid registry path {path}"), e)
        })?;
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }
        Ok(url)
    }

    fn send(&self, method: Method, url: &Url, body: Option<&str>) -> Result<HttpResponse, RegistryError> {
        self.send_counted(method, url, body).map(|(resp, _)| resp)
    }

    /// Like `send`, also returning how many attempts were made.
    fn send_counted(
        &self,
        method: Method,
        url: &Url,
        body: Option<&str>,
    ) -> Result<(HttpResponse, u32), RegistryError> {
        tracing::debug!(?method, url = %url, "registry request");
        let mut attempts = 0u32;
        let resp = run_with_retry(&self.retry, || {
            attempts += 1;
            let resp = http::perform(method, url.as_str(), body, self.timeout)?;
            if classify_http_status(resp.status).is_transient() {
                return Err(TransportError::Http(resp.status));
            }
            Ok(resp)
        })
        .map_err(|e| RegistryError::communication_with(format!("{method:?} {url}"), e))?;
        Ok((resp, attempts))
    }

    /// Stored copy of `job` if it holds exactly the write of `job`, i.e. the
    /// next version with the same status.
    fn stored_write_of(&self, job: &Job) -> Result<Option<Job>, RegistryError> {
        let stored = self.get_job(job.id)?;
        Ok((stored.version == job.version + 1 && stored.status == job.status).then_some(stored))
    }

    /// Raw `GET job/{id}.json` response, for callers that want to inspect it themselves.
    pub fn fetch_job_response(&self, id: JobId) -> Result<HttpResponse, RegistryError> {
        let url = self.endpoint(&format!("job/{id}.json"), &[])?;
        self.send(Method::Get, &url, None)
    }
}

fn unexpected(resp: &HttpResponse) -> RegistryError {
    RegistryError::communication(format!(
        "registry answered HTTP {}: {}",
        resp.status,
        resp.body_str().chars().take(200).collect::<String>()
    ))
}

pub(crate) fn job_from_response(id: JobId, resp: &HttpResponse) -> Result<Job, RegistryError> {
    match resp.status {
        404 => Err(RegistryError::NotFound(id)),
        _ if resp.has_entity() => Ok(job::parse_job(resp.body_str())?),
        _ => Err(unexpected(resp)),
    }
}

fn parse_number<T: std::str::FromStr>(resp: &HttpResponse, what: &str) -> Result<T, RegistryError> {
    if !resp.has_entity() {
        return Err(unexpected(resp));
    }
    resp.body_str()
        .trim()
        .parse()
        .map_err(|_| RegistryError::InvalidResponse(format!("{what}: {:?}", resp.body_str())))
}

impl JobRegistry for RemoteRegistry {
    fn get_job(&self, id: JobId) -> Result<Job, RegistryError> {
        let resp = self.fetch_job_response(id)?;
        job_from_response(id, &resp)
    }

    fn update_job(&self, job: &Job) -> Result<Job, RegistryError> {
        let url = self.endpoint(&format!("job/{}.json", job.id), &[])?;
        let body = job::to_json(job)?;
        let (resp, attempts) = self.send_counted(Method::Put, &url, Some(&body))?;
        match resp.status {
            409 => {
                // An earlier attempt may have been applied with its answer lost;
                // the retry then collides with that very write.
                if attempts > 1 {
                    if let Some(stored) = self.stored_write_of(job)? {
                        tracing::debug!(job_id = job.id, attempts, "retried update had already been applied");
                        return Ok(stored);
                    }
                }
                Err(RegistryError::Conflict {
                    job_id: job.id,
                    reason: resp.body_str().trim().to_string(),
                })
            }
            204 => self.get_job(job.id),
            _ => job_from_response(job.id, &resp),
        }
    }

    fn count(&self, job_type: &str, status: JobStatus) -> Result<u64, RegistryError> {
        let url = self.endpoint(
            "count",
            &[("serviceType", job_type), ("status", status.as_str())],
        )?;
        let resp = self.send(Method::Get, &url, None)?;
        parse_number(&resp, "count")
    }

    fn own_load(&self) -> Result<f32, RegistryError> {
        let url = self.endpoint("ownload", &[("host", self.hostname.as_str())])?;
        let resp = self.send(Method::Get, &url, None)?;
        parse_number(&resp, "own load")
    }

    fn max_load_on_node(&self, host: &str) -> Result<NodeLoad, RegistryError> {
        let url = self.endpoint("maxload", &[("host", host)])?;
        let resp = self.send(Method::Get, &url, None)?;
        match resp.status {
            404 => Err(RegistryError::HostNotFound(host.to_string())),
            _ if resp.has_entity() => serde_json::from_str(resp.body_str())
                .map_err(|e| RegistryError::Decode(e.into())),
            _ => Err(unexpected(&resp)),
        }
    }

    fn registry_hostname(&self) -> Result<String, RegistryError> {
        Ok(self.hostname.clone())
    }
}
