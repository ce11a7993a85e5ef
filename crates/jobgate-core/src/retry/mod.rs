//! Retry and backoff for registry HTTP calls.
//!
//! Only the HTTP registry client retries. Admission control, the barrier and
//! the query helpers surface registry errors to their caller as they are.

mod classify;
mod error;
mod policy;
mod run;

pub use classify::classify_http_status;
pub use error::TransportError;
pub use policy::{ErrorKind, RetryDecision, RetryPolicy};
pub use run::run_with_retry;
