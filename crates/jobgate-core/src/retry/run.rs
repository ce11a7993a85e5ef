//! Retry loop around a single registry exchange.

use super::error::TransportError;
use super::policy::{RetryDecision, RetryPolicy};

/// Calls `f` until it succeeds, fails with a non-transient error, or the
/// policy runs out of attempts. Sleeps the backoff delay between attempts.
pub fn run_with_retry<T, F>(policy: &RetryPolicy, mut f: F) -> Result<T, TransportError>
where
    F: FnMut() -> Result<T, TransportError>,
{
    let mut attempt = 1u32;
    loop {
        let err = match f() {
            Ok(v) => return Ok(v),
            Err(e) => e,
        };
        let kind = err.kind();
        let RetryDecision::RetryAfter(delay) = policy.decide(attempt, kind) else {
            return Err(err);
        };
        tracing::debug!(attempt, ?kind, delay_ms = delay.as_millis() as u64, "retrying registry request: {}", err);
        std::thread::sleep(delay);
        attempt = attempt.saturating_add(1);
    }
}
