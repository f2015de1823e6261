//! In-memory `Fetcher` for unit tests.

use std::collections::HashMap;
use std::sync::Mutex;

use super::{FetchError, Fetcher, Headers, HttpResponse};

/// One scripted reply.
#[derive(Debug, Clone)]
pub(crate) enum Reply {
    Body {
        content_type: Option<String>,
        body: Vec<u8>,
    },
    Status(u32),
    /// Transport failure with the given curl error code.
    Transport(i32),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Call {
    pub method: &'static str,
    pub url: String,
    pub headers: Headers,
}

/// Replies are consumed in order per URL; the last one repeats.
/// Unknown URLs answer 404.
#[derive(Default)]
pub(crate) struct MockFetcher {
    routes: Mutex<HashMap<String, Vec<Reply>>>,
    heads: Mutex<HashMap<String, u32>>,
    calls: Mutex<Vec<Call>>,
}

impl MockFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on(&self, url: &str, replies: Vec<Reply>) -> &Self {
        self.routes.lock().unwrap().insert(url.to_string(), replies);
        self
    }

    pub fn text(&self, url: &str, body: &str) -> &Self {
        self.on(
            url,
            vec![Reply::Body {
                content_type: Some("text/html".to_string()),
                body: body.as_bytes().to_vec(),
            }],
        )
    }

    pub fn bytes(&self, url: &str, content_type: Option<&str>, body: &[u8]) -> &Self {
        self.on(
            url,
            vec![Reply::Body {
                content_type: content_type.map(str::to_string),
                body: body.to_vec(),
            }],
        )
    }

    pub fn status(&self, url: &str, code: u32) -> &Self {
        self.on(url, vec![Reply::Status(code)])
    }

    /// Explicit HEAD status; otherwise HEAD is 200 when GET would succeed.
    pub fn head_status(&self, url: &str, code: u32) -> &Self {
        self.heads.lock().unwrap().insert(url.to_string(), code);
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn get_count(&self, url: &str) -> usize {
        self.calls()
            .iter()
            .filter(|c| c.method == "GET" && c.url == url)
            .count()
    }

    fn record(&self, method: &'static str, url: &str, headers: &Headers) -> usize {
        let mut calls = self.calls.lock().unwrap();
        calls.push(Call {
            method,
            url: url.to_string(),
            headers: headers.clone(),
        });
        calls
            .iter()
            .filter(|c| c.method == method && c.url == url)
            .count()
    }
}

impl Fetcher for MockFetcher {
    fn get(&self, url: &str, headers: &Headers) -> Result<HttpResponse, FetchError> {
        let n = self.record("GET", url, headers);
        let routes = self.routes.lock().unwrap();
        let reply = match routes.get(url) {
            Some(replies) if !replies.is_empty() => replies[(n - 1).min(replies.len() - 1)].clone(),
            _ => Reply::Status(404),
        };
        match reply {
            Reply::Body { content_type, body } => Ok(HttpResponse {
                status: 200,
                content_type,
                body,
            }),
            Reply::Status(code) if (200..300).contains(&code) => Ok(HttpResponse {
                status: code,
                content_type: None,
                body: Vec::new(),
            }),
            Reply::Status(code) => Err(FetchError::Http(code)),
            Reply::Transport(code) => Err(FetchError::Curl(curl::Error::new(code as _))),
        }
    }

    fn head(&self, url: &str, headers: &Headers) -> Result<u32, FetchError> {
        self.record("HEAD", url, headers);
        if let Some(code) = self.heads.lock().unwrap().get(url) {
            return Ok(*code);
        }
        let routes = self.routes.lock().unwrap();
        match routes.get(url).and_then(|r| r.first()) {
            Some(Reply::Body { .. }) => Ok(200),
            Some(Reply::Status(code)) => Ok(*code),
            Some(Reply::Transport(code)) => Err(FetchError::Curl(curl::Error::new(*code as _))),
            None => Ok(404),
        }
    }
}
