use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::http::{HeaderPolicy, Headers};
use crate::resolve::{Gateway, DEFAULT_MAX_DEPTH};
use crate::retry::RetryPolicy;

/// Image fetch retry parameters (`[retry]` in config.toml).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Attempts per image, including the first. A 429 counts as an attempt.
    pub max_attempts: u32,
    /// Wait after a 429 response, in seconds.
    pub rate_limit_wait_secs: u64,
    /// Wait after any other failure, in seconds.
    pub transient_wait_secs: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        let p = RetryPolicy::default();
        Self {
            max_attempts: p.max_attempts,
            rate_limit_wait_secs: p.rate_limit_wait.as_secs(),
            transient_wait_secs: p.transient_wait.as_secs(),
        }
    }
}

/// Request headers for image hosts (`[headers]` in config.toml).
///
/// `default` replaces the built-in default set when present; `overrides` are
/// added on top of the built-in per-host table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeadersConfig {
    pub default: Option<BTreeMap<String, String>>,
    pub overrides: BTreeMap<String, BTreeMap<String, String>>,
}

/// Global configuration loaded from `~/.config/cyoa/config.toml`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CyoaConfig {
    /// How many iframe levels the resolver follows.
    pub max_depth: u32,
    /// Whole-request timeout for every HTTP request, in seconds.
    pub request_timeout_secs: u64,
    /// Concurrent image fetches.
    pub image_workers: usize,
    pub retry: RetryConfig,
    pub gateway: Gateway,
    pub headers: HeadersConfig,
}

impl Default for CyoaConfig {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            request_timeout_secs: 60,
            image_workers: 1,
            retry: RetryConfig::default(),
            gateway: Gateway::default(),
            headers: HeadersConfig::default(),
        }
    }
}

fn to_headers(map: &BTreeMap<String, String>) -> Headers {
    map.iter().map(|(k, v)| (k.clone(), v.clone())).collect()
}

impl CyoaConfig {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.retry.max_attempts.max(1),
            rate_limit_wait: Duration::from_secs(self.retry.rate_limit_wait_secs),
            transient_wait: Duration::from_secs(self.retry.transient_wait_secs),
        }
    }

    pub fn header_policy(&self) -> HeaderPolicy {
        let mut policy = HeaderPolicy::default();
        if let Some(default) = &self.headers.default {
            policy = policy.with_default(to_headers(default));
        }
        for (host, set) in &self.headers.overrides {
            policy = policy.with_override(host, to_headers(set));
        }
        policy
    }

    pub fn gateway(&self) -> Gateway {
        self.gateway.clone()
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("cyoa")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<CyoaConfig> {
    load_or_init_at(&config_path()?)
}

/// `load_or_init` against an explicit path.
pub fn load_or_init_at(path: &Path) -> Result<CyoaConfig> {
    if !path.exists() {
        let default_cfg = CyoaConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }

    let data = fs::read_to_string(path)?;
    let cfg: CyoaConfig =
        toml::from_str(&data).with_context(|| format!("invalid config {}", path.display()))?;
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_values() {
        let cfg = CyoaConfig::default();
        assert_eq!(cfg.max_depth, 3);
        assert_eq!(cfg.request_timeout_secs, 60);
        assert_eq!(cfg.image_workers, 1);
        assert_eq!(cfg.retry_policy(), RetryPolicy::default());
        assert_eq!(cfg.gateway().host, "cyoa.cafe");
    }

    #[test]
    fn config_toml_roundtrip() {
        let cfg = CyoaConfig::default();
        let toml = toml::to_string_pretty(&cfg).unwrap();
        let parsed: CyoaConfig = toml::from_str(&toml).unwrap();
        assert_eq!(parsed, cfg);
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let toml = r#"
            image_workers = 4

            [retry]
            rate_limit_wait_secs = 20
        "#;
        let cfg: CyoaConfig = toml::from_str(toml).unwrap();
        assert_eq!(cfg.image_workers, 4);
        assert_eq!(cfg.max_depth, 3);
        let p = cfg.retry_policy();
        assert_eq!(p.max_attempts, 3);
        assert_eq!(p.rate_limit_wait, Duration::from_secs(20));
        assert_eq!(p.transient_wait, Duration::from_secs(10));
    }

    #[test]
    fn header_overrides_extend_builtin_table() {
        let toml = r#"
            [headers.default]
            User-Agent = "cyoa-test"

            [headers.overrides."img.example"]
            Referer = "https://img.example/"
        "#;
        let cfg: CyoaConfig = toml::from_str(toml).unwrap();
        let policy = cfg.header_policy();
        let d = policy.headers_for_url("https://other.example/a.png");
        assert_eq!(d.get("User-Agent").map(String::as_str), Some("cyoa-test"));
        let o = policy.headers_for_url("https://img.example/a.png");
        assert_eq!(o.get("Referer").map(String::as_str), Some("https://img.example/"));
        let builtin = policy.headers_for_url("https://umgur.com/a.png");
        assert_eq!(builtin.get("User-Agent").map(String::as_str), Some("curl/8.1.1"));
    }

    #[test]
    fn load_or_init_writes_default_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/config.toml");
        let cfg = load_or_init_at(&path).unwrap();
        assert_eq!(cfg, CyoaConfig::default());
        assert!(path.exists());
        let again = load_or_init_at(&path).unwrap();
        assert_eq!(again, cfg);
    }

    #[test]
    fn invalid_toml_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "max_depth = \"deep\"").unwrap();
        assert!(load_or_init_at(&path).is_err());
    }
}
