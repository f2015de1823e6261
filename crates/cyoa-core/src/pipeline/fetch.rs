//! Fetch one image under the retry policy.

use tracing::{debug, error};

use crate::control::AbortToken;
use crate::error::CyoaError;
use crate::http::{Fetcher, HeaderPolicy};
use crate::mime;
use crate::retry::{run_with_retry, RetryPolicy};

/// How fetching an image ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    Success,
    /// Every attempt, or the last one, was answered with 429.
    RateLimited,
    Failed,
}

/// Result of fetching one image URL. `bytes` and `mime_type` are empty unless
/// the outcome is `Success`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedImage {
    pub source_url: String,
    pub bytes: Vec<u8>,
    pub mime_type: String,
    pub outcome: FetchOutcome,
}

impl ResolvedImage {
    fn failed(source_url: &str, outcome: FetchOutcome) -> Self {
        Self {
            source_url: source_url.to_string(),
            bytes: Vec::new(),
            mime_type: String::new(),
            outcome,
        }
    }

    pub fn is_success(&self) -> bool {
        self.outcome == FetchOutcome::Success
    }
}

/// GET `url` with the headers `policy` picks for its host, retrying per `retry`.
///
/// Failures become a non-success `ResolvedImage`; only an abort is an error.
pub fn fetch_image(
    fetcher: &dyn Fetcher,
    headers: &HeaderPolicy,
    retry: &RetryPolicy,
    abort: &AbortToken,
    url: &str,
) -> Result<ResolvedImage, CyoaError> {
    let request_headers = headers.headers_for_url(url);
    let result = run_with_retry(retry, abort, url, |attempt| {
        debug!(attempt, "fetching image {}", url);
        fetcher.get(url, request_headers)
    });
    match result.map_err(CyoaError::from) {
        Ok(response) => Ok(ResolvedImage {
            source_url: url.to_string(),
            mime_type: mime::detect(response.content_type.as_deref(), url),
            bytes: response.body,
            outcome: FetchOutcome::Success,
        }),
        Err(CyoaError::RateLimited(_)) => {
            error!("all retries failed for {} (rate limited)", url);
            Ok(ResolvedImage::failed(url, FetchOutcome::RateLimited))
        }
        Err(e) if e.is_recoverable() => {
            error!("all retries failed for {}: {}", url, e);
            Ok(ResolvedImage::failed(url, FetchOutcome::Failed))
        }
        Err(e) => Err(e),
    }
}
