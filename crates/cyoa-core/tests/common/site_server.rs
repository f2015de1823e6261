//! Minimal HTTP/1.1 server for integration tests.
//!
//! Serves a fixed table of routes keyed by request target (`/a/b.json`).
//! A route holds a list of responses that are served in order, the last one
//! repeating. HEAD gets the status and headers of the next GET response
//! without consuming it. Unknown targets answer 404. Every request is counted
//! per method and target.

use std::collections::HashMap;
use std::io::{Read, Write};
use std::net::TcpListener;
use std::sync::{Arc, Mutex};
use std::thread;

#[derive(Debug, Clone)]
pub struct Response {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

impl Response {
    pub fn ok(content_type: &str, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status: 200,
            content_type: Some(content_type.to_string()),
            body: body.into(),
        }
    }

    pub fn html(body: &str) -> Self {
        Self::ok("text/html; charset=utf-8", body)
    }

    pub fn status(status: u16) -> Self {
        Self {
            status,
            content_type: None,
            body: Vec::new(),
        }
    }
}

#[derive(Default)]
struct State {
    routes: HashMap<String, Vec<Response>>,
    served: HashMap<String, usize>,
    hits: HashMap<(String, String), usize>,
}

/// Handle to a running server. The server runs until the process exits.
#[derive(Clone)]
pub struct SiteServer {
    base: String,
    state: Arc<Mutex<State>>,
}

impl SiteServer {
    /// Base URL with trailing slash, e.g. `http://127.0.0.1:12345/`.
    pub fn base(&self) -> &str {
        &self.base
    }

    /// Absolute URL for `path` (no leading slash).
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path.trim_start_matches('/'))
    }

    pub fn route(&self, path: &str, responses: Vec<Response>) -> &Self {
        let key = format!("/{}", path.trim_start_matches('/'));
        self.state.lock().unwrap().routes.insert(key, responses);
        self
    }

    pub fn html(&self, path: &str, body: &str) -> &Self {
        self.route(path, vec![Response::html(body)])
    }

    pub fn json(&self, path: &str, body: &str) -> &Self {
        self.route(path, vec![Response::ok("application/json", body)])
    }

    pub fn hits(&self, method: &str, path: &str) -> usize {
        let key = (method.to_string(), format!("/{}", path.trim_start_matches('/')));
        self.state.lock().unwrap().hits.get(&key).copied().unwrap_or(0)
    }
}

/// Start an empty server in a background thread.
pub fn start() -> SiteServer {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().unwrap().port();
    let state = Arc::new(Mutex::new(State::default()));
    let shared = Arc::clone(&state);
    thread::spawn(move || {
        for stream in listener.incoming().flatten() {
            let state = Arc::clone(&shared);
            thread::spawn(move || handle(stream, &state));
        }
    });
    SiteServer {
        base: format!("http://127.0.0.1:{}/", port),
        state,
    }
}

fn reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        404 => "Not Found",
        429 => "Too Many Requests",
        500 => "Internal Server Error",
        503 => "Service Unavailable",
        _ => "Status",
    }
}

fn handle(mut stream: std::net::TcpStream, state: &Mutex<State>) {
    let _ = stream.set_read_timeout(Some(std::time::Duration::from_secs(2)));
    let _ = stream.set_write_timeout(Some(std::time::Duration::from_secs(2)));
    let mut buf = [0u8; 8192];
    let n = match stream.read(&mut buf) {
        Ok(0) => return,
        Ok(n) => n,
        Err(_) => return,
    };
    let request = match std::str::from_utf8(&buf[..n]) {
        Ok(s) => s,
        Err(_) => return,
    };
    let mut parts = request.lines().next().unwrap_or("").split_whitespace();
    let method = parts.next().unwrap_or("").to_ascii_uppercase();
    let target = parts.next().unwrap_or("/").to_string();

    let response = {
        let mut st = state.lock().unwrap();
        *st.hits.entry((method.clone(), target.clone())).or_insert(0) += 1;
        let served = st.served.get(&target).copied().unwrap_or(0);
        let response = match st.routes.get(&target) {
            Some(list) if !list.is_empty() => list[served.min(list.len() - 1)].clone(),
            _ => Response::status(404),
        };
        if method == "GET" {
            *st.served.entry(target).or_insert(0) += 1;
        }
        response
    };

    let content_type = response
        .content_type
        .as_deref()
        .map(|ct| format!("Content-Type: {}\r\n", ct))
        .unwrap_or_default();
    let head = format!(
        "HTTP/1.1 {} {}\r\nContent-Length: {}\r\n{}Connection: close\r\n\r\n",
        response.status,
        reason(response.status),
        response.body.len(),
        content_type
    );
    let _ = stream.write_all(head.as_bytes());
    if method == "GET" {
        let _ = stream.write_all(&response.body);
    }
}
