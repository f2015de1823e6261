//! libcurl-backed `Fetcher`.

use std::str;
use std::time::Duration;

use super::{parse, FetchError, Fetcher, Headers, HttpResponse};

/// `Fetcher` built on the curl crate. One `Easy` handle per request, so a
/// single instance can be shared across worker threads.
#[derive(Debug, Clone)]
pub struct CurlFetcher {
    connect_timeout: Duration,
    timeout: Duration,
}

impl Default for CurlFetcher {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(15),
            timeout: Duration::from_secs(60),
        }
    }
}

impl CurlFetcher {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            ..Self::default()
        }
    }

    fn prepare(&self, url: &str, headers: &Headers) -> Result<curl::easy::Easy, curl::Error> {
        let mut easy = curl::easy::Easy::new();
        easy.url(url)?;
        easy.follow_location(true)?;
        easy.max_redirections(10)?;
        easy.connect_timeout(self.connect_timeout)?;
        easy.timeout(self.timeout)?;
        // Empty string enables every encoding libcurl was built with.
        easy.accept_encoding("")?;

        // Build curl list for custom headers (e.g. "Name: value").
        if !headers.is_empty() {
            let mut list = curl::easy::List::new();
            for (k, v) in headers {
                list.append(&format!("{}: {}", k.trim(), v.trim()))?;
            }
            easy.http_headers(list)?;
        }
        Ok(easy)
    }
}

impl Fetcher for CurlFetcher {
    fn get(&self, url: &str, headers: &Headers) -> Result<HttpResponse, FetchError> {
        let mut easy = self.prepare(url, headers)?;
        let mut lines: Vec<String> = Vec::new();
        let mut body: Vec<u8> = Vec::new();
        {
            let mut transfer = easy.transfer();
            transfer.header_function(|data| {
                if let Ok(s) = str::from_utf8(data) {
                    lines.push(s.trim_end().to_string());
                }
                true
            })?;
            transfer.write_function(|data| {
                body.extend_from_slice(data);
                Ok(data.len())
            })?;
            transfer.perform()?;
        }

        let code = easy.response_code()?;
        tracing::debug!(status = code, bytes = body.len(), "GET {}", url);
        if !(200..300).contains(&code) {
            return Err(FetchError::Http(code));
        }

        Ok(HttpResponse {
            status: code,
            content_type: parse::content_type(&lines),
            body,
        })
    }

    fn head(&self, url: &str, headers: &Headers) -> Result<u32, FetchError> {
        let mut easy = self.prepare(url, headers)?;
        easy.nobody(true)?; // HEAD request
        easy.perform()?;
        let code = easy.response_code()?;
        tracing::debug!(status = code, "HEAD {}", url);
        Ok(code)
    }
}
