//! Transport error type for retry classification.

use std::fmt;

/// Failure of a single HTTP exchange with the registry, before it is mapped
/// into a [`RegistryError`](crate::registry::RegistryError).
#[derive(Debug)]
pub enum TransportError {
    /// Curl reported an error (timeout, connection, etc.).
    Curl(curl::Error),
    /// The registry answered with a status we may retry on (429, 5xx).
    Http(u32),
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportError::Curl(e) => write!(f, "{}", e),
            TransportError::Http(code) => write!(f, "HTTP {}", code),
        }
    }
}

impl std::error::Error for TransportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TransportError::Curl(e) => Some(e),
            TransportError::Http(_) => None,
        }
    }
}

impl From<curl::Error> for TransportError {
    fn from(e: curl::Error) -> Self {
        TransportError::Curl(e)
    }
}
