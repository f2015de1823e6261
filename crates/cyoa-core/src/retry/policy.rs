use std::time::Duration;

/// High-level classification of an error for retry purposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Server asked us to slow down (HTTP 429).
    Throttled,
    /// Operation timed out (connect/read).
    Timeout,
    /// Network-level failure (connection reset, DNS, etc.).
    Connection,
    /// Any other non-success HTTP status.
    Http(u32),
    /// The abort token was tripped.
    Aborted,
    /// Anything else reported by the transport.
    Other,
}

/// Decision returned by the retry policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Do not retry this error.
    NoRetry,
    /// Retry after the given delay.
    RetryAfter(Duration),
}

/// Fixed-wait retry policy for image fetches.
///
/// A 429 response consumes an attempt like any other failure, so a resource
/// that always rate-limits is given up after `max_attempts` requests in total.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Maximum number of attempts (including the first).
    pub max_attempts: u32,
    /// Wait after an HTTP 429 before the next attempt.
    pub rate_limit_wait: Duration,
    /// Wait after any other failure before the next attempt.
    pub transient_wait: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            rate_limit_wait: Duration::from_secs(60),
            transient_wait: Duration::from_secs(10),
        }
    }
}

impl RetryPolicy {
    /// Decide what to do after a failed attempt.
    ///
    /// `attempt` is 1-based (1 = first attempt).
    pub fn decide(&self, attempt: u32, kind: ErrorKind) -> RetryDecision {
        if attempt >= self.max_attempts {
            return RetryDecision::NoRetry;
        }
        match kind {
            ErrorKind::Aborted => RetryDecision::NoRetry,
            ErrorKind::Throttled => RetryDecision::RetryAfter(self.rate_limit_wait),
            ErrorKind::Timeout | ErrorKind::Connection | ErrorKind::Http(_) | ErrorKind::Other => {
                RetryDecision::RetryAfter(self.transient_wait)
            }
        }
    }
}
