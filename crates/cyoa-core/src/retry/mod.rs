//! Retry and backoff policy for image fetches.
//!
//! Classification turns a `FetchError` into an `ErrorKind`; the policy maps
//! `(attempt, kind)` to a wait or a stop. Rate limiting (HTTP 429) and every
//! other failure have separate, fixed waits.

mod classify;
mod policy;
mod run;

pub use classify::{classify, classify_curl_error, classify_http_status};
pub use policy::{ErrorKind, RetryDecision, RetryPolicy};
pub use run::run_with_retry;
