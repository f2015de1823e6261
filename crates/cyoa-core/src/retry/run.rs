//! Retry loop: run a closure until success or policy says stop.

use tracing::warn;

use super::classify;
use super::policy::{ErrorKind, RetryDecision, RetryPolicy};
use crate::control::AbortToken;
use crate::http::FetchError;

/// Runs `f` until it succeeds or the retry policy says to stop.
///
/// `f` receives the 1-based attempt number. On a retryable failure the loop
/// sleeps for the policy's wait; the sleep and every attempt observe `abort`.
/// Returns the last error when attempts are exhausted.
pub fn run_with_retry<T, F>(
    policy: &RetryPolicy,
    abort: &AbortToken,
    label: &str,
    mut f: F,
) -> Result<T, FetchError>
where
    F: FnMut(u32) -> Result<T, FetchError>,
{
    let mut attempt = 1u32;
    loop {
        if abort.is_aborted() {
            return Err(FetchError::Aborted);
        }
        let e = match f(attempt) {
            Ok(v) => return Ok(v),
            Err(e) => e,
        };
        let kind = classify::classify(&e);
        match policy.decide(attempt, kind) {
            RetryDecision::NoRetry => {
                if kind != ErrorKind::Aborted {
                    warn!(attempt, "giving up on {}: {}", label, e);
                }
                return Err(e);
            }
            RetryDecision::RetryAfter(d) => {
                if kind == ErrorKind::Throttled {
                    warn!(
                        "received 429 for {}; waiting {}s before retrying",
                        label,
                        d.as_secs_f64()
                    );
                } else {
                    warn!(attempt, "attempt failed for {}: {}", label, e);
                }
                if abort.sleep(d).is_err() {
                    return Err(FetchError::Aborted);
                }
                attempt += 1;
            }
        }
    }
}
