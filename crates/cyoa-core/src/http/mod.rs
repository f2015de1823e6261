//! HTTP access for the resolver and the image pipeline.
//!
//! Everything above this module talks to the network through the `Fetcher`
//! trait. `CurlFetcher` is the libcurl implementation; tests swap in an
//! in-memory fetcher.

mod curl_fetcher;
mod headers;
#[cfg(test)]
pub(crate) mod mock;
mod parse;

pub use curl_fetcher::CurlFetcher;
pub use headers::HeaderPolicy;

use std::collections::HashMap;

/// Request headers as `name -> value`.
pub type Headers = HashMap<String, String>;

/// Error from a single request.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// Curl reported an error (timeout, connection, etc.).
    #[error("{0}")]
    Curl(#[from] curl::Error),
    /// HTTP response had a non-2xx status.
    #[error("HTTP {0}")]
    Http(u32),
    /// Request not attempted because the abort token was tripped.
    #[error("aborted")]
    Aborted,
}

/// Successful GET response.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u32,
    /// `Content-Type` of the final response, if sent.
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// Body decoded as UTF-8, invalid sequences replaced.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Blocking HTTP client used by the core.
pub trait Fetcher: Send + Sync {
    /// GET `url`. Redirects are followed; a non-2xx final status is `FetchError::Http`.
    fn get(&self, url: &str, headers: &Headers) -> Result<HttpResponse, FetchError>;

    /// HEAD `url` and return the final status code, whatever it is.
    fn head(&self, url: &str, headers: &Headers) -> Result<u32, FetchError>;

    /// GET with no custom headers, decoded as text.
    fn get_text(&self, url: &str) -> Result<String, FetchError> {
        self.get(url, &Headers::new()).map(|r| r.text())
    }

    /// True when HEAD answers exactly 200. Transport errors count as absent.
    fn exists(&self, url: &str) -> bool {
        matches!(self.head(url, &Headers::new()), Ok(200))
    }
}
