//! Gateway redirect: turn a `/game/<id>` link into the real content URL.

use serde::{Deserialize, Serialize};

use crate::error::CyoaError;
use crate::http::Fetcher;

/// Where the gateway lives and where its API answers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Gateway {
    /// Hostname whose links are gateway pages (subdomains included).
    pub host: String,
    /// Scheme and authority of the records API.
    pub api_base: String,
}

impl Default for Gateway {
    fn default() -> Self {
        Self {
            host: "cyoa.cafe".to_string(),
            api_base: "https://cyoa.cafe".to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct GameRecord {
    #[serde(default)]
    iframe_url: Option<String>,
}

impl Gateway {
    /// True when `url` points at the gateway host or one of its subdomains.
    pub fn matches(&self, url: &str) -> bool {
        let Ok(parsed) = url::Url::parse(url) else {
            return false;
        };
        let Some(host) = parsed.host_str() else {
            return false;
        };
        let gateway = self.host.to_ascii_lowercase();
        host == gateway || host.ends_with(&format!(".{gateway}"))
    }

    /// Game identifier from a `/game/<id>` path.
    pub fn game_id(url: &str) -> Result<String, CyoaError> {
        let parsed = url::Url::parse(url)
            .map_err(|e| CyoaError::MalformedInput(format!("invalid game URL {url}: {e}")))?;
        let parts: Vec<&str> = parsed.path().trim_matches('/').split('/').collect();
        match parts.as_slice() {
            ["game", id] if !id.is_empty() => Ok(id.to_string()),
            _ => Err(CyoaError::MalformedInput(format!(
                "invalid game URL format: {url}"
            ))),
        }
    }

    fn record_url(&self, id: &str) -> String {
        format!(
            "{}/api/collections/games/records/{}",
            self.api_base.trim_end_matches('/'),
            id
        )
    }

    /// Ask the records API for the game's `iframe_url`.
    pub fn resolve(&self, fetcher: &dyn Fetcher, url: &str) -> Result<String, CyoaError> {
        let id = Self::game_id(url)?;
        let api_url = self.record_url(&id);
        let body = fetcher
            .get_text(&api_url)
            .map_err(|e| match CyoaError::from(e) {
                e if e.is_recoverable() => {
                    CyoaError::Network(format!("gateway request {api_url} failed: {e}"))
                }
                e => e,
            })?;
        let record: GameRecord = serde_json::from_str(&body).map_err(|e| {
            CyoaError::MalformedInput(format!("gateway response for {id} is not JSON: {e}"))
        })?;
        match record.iframe_url {
            Some(real) if !real.trim().is_empty() => Ok(real.trim().to_string()),
            _ => Err(CyoaError::MalformedInput(format!(
                "'iframe_url' not found in the API response for game ID: {id}"
            ))),
        }
    }
}
