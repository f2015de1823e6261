//! Output naming and no-overwrite saving.

use anyhow::{Context, Result};
use percent_encoding::percent_decode_str;
use std::fs;
use std::path::{Path, PathBuf};

/// Name used when neither the URL path nor the host yields one.
pub const FALLBACK_NAME: &str = "downloaded_cyoa";

/// Percent-decode and keep only `[A-Za-z0-9_\-./]`.
pub fn clean_component(raw: &str) -> String {
    percent_decode_str(raw)
        .decode_utf8_lossy()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.' | '/'))
        .collect()
}

/// First segment of the URL path (`/a/b/` → `a`), empty when the path is `/`.
pub fn first_folder(url: &str) -> String {
    url::Url::parse(url)
        .ok()
        .and_then(|u| {
            u.path()
                .trim_matches('/')
                .split('/')
                .next()
                .map(str::to_string)
        })
        .unwrap_or_default()
}

/// First label of the host's subdomain part (`a.b.example.org` → `a`).
/// Hosts with two labels or fewer, and IP addresses, have none.
///
/// Labels are counted, not matched against a public suffix list, so hosts
/// under a multi-label suffix report the registrable name instead
/// (`example.co.uk` → `example`).
pub fn first_subdomain(url: &str) -> String {
    let Some(parsed) = url::Url::parse(url).ok() else {
        return String::new();
    };
    let Some(url::Host::Domain(host)) = parsed.host() else {
        return String::new();
    };
    let labels: Vec<&str> = host.split('.').filter(|l| !l.is_empty()).collect();
    if labels.len() > 2 {
        labels[0].to_string()
    } else {
        String::new()
    }
}

/// Output base name: explicit name, else first path folder, else first
/// subdomain, else `downloaded_cyoa`.
pub fn output_name(explicit: Option<&str>, project_url: &str) -> String {
    if let Some(name) = explicit.map(str::trim).filter(|n| !n.is_empty()) {
        return name.to_string();
    }
    [first_folder(project_url), first_subdomain(project_url)]
        .iter()
        .map(|c| clean_component(c))
        .find(|c| !c.is_empty())
        .unwrap_or_else(|| FALLBACK_NAME.to_string())
}

/// Replace characters that cannot appear in a file name.
pub fn file_safe(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*' => '_',
            c => c,
        })
        .collect()
}

/// `dir/file_name`, or `dir/<stem>_N<ext>` with the first free N.
pub fn unique_path(dir: &Path, file_name: &str) -> PathBuf {
    let file_name = file_safe(file_name);
    let candidate = dir.join(&file_name);
    if !candidate.exists() {
        return candidate;
    }
    let (stem, ext) = cyoa_core::url_model::split_extension(&file_name);
    (1u32..)
        .map(|n| dir.join(format!("{stem}_{n}{ext}")))
        .find(|p| !p.exists())
        .unwrap_or(candidate)
}

/// Write `content` under a free name derived from `file_name`. Returns the path used.
pub fn save_new(dir: &Path, file_name: &str, content: &str) -> Result<PathBuf> {
    let path = unique_path(dir, file_name);
    fs::write(&path, content).with_context(|| format!("failed to write {}", path.display()))?;
    tracing::info!("file saved as: {}", path.display());
    Ok(path)
}
