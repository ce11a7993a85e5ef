//! Mapping of registry transport failures onto retry kinds.

use super::error::TransportError;
use super::policy::ErrorKind;

/// Retry kind for a registry HTTP status. Only throttling and server
/// errors are transient; 404/409 and friends carry an answer.
pub fn classify_http_status(code: u32) -> ErrorKind {
    match code {
        429 | 503 => ErrorKind::Throttled,
        500..=599 => ErrorKind::Http5xx(code as u16),
        _ => ErrorKind::Other,
    }
}

fn classify_curl(e: &curl::Error) -> ErrorKind {
    if e.is_operation_timedout() {
        ErrorKind::Timeout
    } else if e.is_couldnt_connect()
        || e.is_couldnt_resolve_host()
        || e.is_couldnt_resolve_proxy()
        || e.is_send_error()
        || e.is_recv_error()
        || e.is_read_error()
        || e.is_got_nothing()
    {
        ErrorKind::Connection
    } else {
        ErrorKind::Other
    }
}

impl TransportError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            TransportError::Curl(e) => classify_curl(e),
            TransportError::Http(code) => classify_http_status(*code),
        }
    }
}
