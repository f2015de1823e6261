//! URL modeling and filename derivation.
//!
//! Two joining rules coexist. The resolver glues relative script
//! and project paths onto a page URL by plain concatenation, matching how the
//! hosting sites lay out their files. Image references inside the project
//! JSON are joined the way a browser would (RFC 3986).

mod path;
mod sanitize;

pub use path::filename_from_url_path;
pub use sanitize::{sanitize_filename, truncate_bytes, NAME_MAX};

use crate::error::CyoaError;
use crate::mime;

/// Filename used when an image URL has no usable last segment.
const DEFAULT_IMAGE_NAME: &str = "image";

fn parse(url: &str) -> Result<url::Url, CyoaError> {
    url::Url::parse(url).map_err(|e| CyoaError::MalformedInput(format!("invalid URL {url}: {e}")))
}

/// True for `http://` and `https://` URLs.
pub fn is_absolute(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}

/// The directory a URL points into.
///
/// Strips the last path segment unless the path already ends in `/`, and
/// drops the query and fragment. An empty path becomes `/`.
///
/// - `https://h.example/a/index.html?x=1` → `https://h.example/a/`
/// - `https://h.example/a/` → `https://h.example/a/`
/// - `https://h.example` → `https://h.example/`
pub fn directory_of(url: &str) -> Result<String, CyoaError> {
    let mut parsed = parse(url)?;
    let path = parsed.path().to_string();
    if !path.ends_with('/') {
        let mut dir = match path.rfind('/') {
            Some(i) => path[..i].to_string(),
            None => String::new(),
        };
        if !dir.ends_with('/') {
            dir.push('/');
        }
        parsed.set_path(&dir);
    }
    parsed.set_query(None);
    parsed.set_fragment(None);
    Ok(parsed.to_string())
}

/// Joins `path` onto `base` by concatenation with exactly one `/` between.
///
/// Absolute `path`s are returned unchanged; protocol-relative ones (`//host/x`)
/// take the scheme of `base`.
pub fn join_concat(base: &str, path: &str) -> String {
    if is_absolute(path) {
        return path.to_string();
    }
    if let Some(rest) = path.strip_prefix("//") {
        let scheme = base.split_once("://").map(|(s, _)| s).unwrap_or("https");
        return format!("{scheme}://{rest}");
    }
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

/// Resolves an image reference against the project's base URL.
pub fn resolve_image_url(base: &str, value: &str) -> Result<String, CyoaError> {
    if is_absolute(value) {
        return Ok(value.to_string());
    }
    let base = if base.ends_with('/') {
        base.to_string()
    } else {
        format!("{base}/")
    };
    let joined = parse(&base)?
        .join(value)
        .map_err(|e| CyoaError::MalformedInput(format!("cannot join {value} onto {base}: {e}")))?;
    Ok(joined.to_string())
}

/// Splits `name` into stem and extension (with dot). Leading dots are part of the stem.
pub fn split_extension(name: &str) -> (&str, &str) {
    let lead = name.len() - name.trim_start_matches('.').len();
    match name[lead..].rfind('.') {
        Some(i) => name.split_at(lead + i),
        None => (name, ""),
    }
}

/// Local filename for an image fetched from `url`.
///
/// Uses the last path segment (sanitized); falls back to `image`. Names without
/// an extension get one derived from `mime_type`.
pub fn image_filename(url: &str, mime_type: &str) -> String {
    let name = filename_from_url_path(url)
        .map(|s| sanitize_filename(&s))
        .filter(|s| !s.is_empty() && s != "." && s != "..")
        .unwrap_or_else(|| DEFAULT_IMAGE_NAME.to_string());

    if split_extension(&name).1.is_empty() {
        format!("{name}{}", mime::extension_for(mime_type))
    } else {
        name
    }
}
