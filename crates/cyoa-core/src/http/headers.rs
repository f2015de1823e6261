//! Per-host request header policy for image fetches.

use std::collections::HashMap;

use super::Headers;

/// Header sets keyed by exact hostname, with a default for every other host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderPolicy {
    default: Headers,
    overrides: HashMap<String, Headers>,
}

fn headers(pairs: &[(&str, &str)]) -> Headers {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

impl Default for HeaderPolicy {
    fn default() -> Self {
        let mut overrides = HashMap::new();
        overrides.insert(
            "umgur.com".to_string(),
            headers(&[("User-Agent", "curl/8.1.1"), ("Accept", "*/*")]),
        );
        Self {
            default: headers(&[("User-Agent", "Mozilla/5.0"), ("Accept-Language", "en-US,en")]),
            overrides,
        }
    }
}

impl HeaderPolicy {
    /// Replace the default header set.
    pub fn with_default(mut self, default: Headers) -> Self {
        self.default = default;
        self
    }

    /// Add or replace the header set for one exact hostname.
    pub fn with_override(mut self, host: &str, set: Headers) -> Self {
        self.overrides.insert(host.to_ascii_lowercase(), set);
        self
    }

    /// Headers to send for `url`. Unparseable URLs get the default set.
    pub fn headers_for_url(&self, url: &str) -> &Headers {
        url::Url::parse(url)
            .ok()
            .and_then(|u| u.host_str().and_then(|h| self.overrides.get(h)))
            .unwrap_or(&self.default)
    }
}
