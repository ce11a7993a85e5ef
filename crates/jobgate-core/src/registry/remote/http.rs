//! Single HTTP exchange with the registry over curl.

use std::time::Duration;

use crate::retry::TransportError;

/// Status and body of a registry HTTP response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u32,
    /// Response body; `None` when the registry sent no entity.
    pub body: Option<String>,
}

impl HttpResponse {
    pub fn new(status: u32, body: Option<String>) -> Self {
        let body = body.filter(|b| !b.trim().is_empty());
        Self { status, body }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// True when the response carries an entity worth parsing
    /// (a 2xx other than 204 No Content, with a non-empty body).
    pub fn has_entity(&self) -> bool {
        self.is_success() && self.status != 204 && self.body.is_some()
    }

    pub fn body_str(&self) -> &str {
        self.body.as_deref().unwrap_or("")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Method {
    Get,
    Put,
}

/// Performs one request and returns the raw response, whatever its status.
///
/// Runs in the current thread; call from `spawn_blocking` if used from async code.
pub(super) fn perform(
    method: Method,
    url: &str,
    body: Option<&str>,
    timeout: Duration,
) -> Result<HttpResponse, TransportError> {
    let mut easy = curl::easy::Easy::new();
    easy.url(url)?;
    easy.follow_location(true)?;
    easy.connect_timeout(timeout.min(Duration::from_secs(15)))?;
    easy.timeout(timeout)?;

    let mut list = curl::easy::List::new();
    list.append("Accept: application/json")?;
    if method == Method::Put {
        list.append("Content-Type: application/json")?;
        easy.custom_request("PUT")?;
        easy.post_fields_copy(body.unwrap_or("").as_bytes())?;
    }
    easy.http_headers(list)?;

    let mut buf = Vec::new();
    {
        let mut transfer = easy.transfer();
        transfer.write_function(|data| {
            buf.extend_from_slice(data);
            Ok(data.len())
        })?;
        transfer.perform()?;
    }

    let status = easy.response_code()?;
    let text = String::from_utf8_lossy(&buf).into_owned();
    Ok(HttpResponse::new(status, Some(text)))
}
