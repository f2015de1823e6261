//! MIME type helpers for image rewriting.

use once_cell::sync::Lazy;
use regex::Regex;

/// Fallback when neither the response nor the URL names a type.
pub const OCTET_STREAM: &str = "application/octet-stream";

/// Extension used when the MIME type has no known extension.
const FALLBACK_EXTENSION: &str = ".bin";

static DATA_URI_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^data:image/[a-zA-Z0-9.+-]+;base64,").unwrap());

/// Extension (lowercase, no dot) to MIME type.
const TYPES: &[(&str, &str)] = &[
    ("png", "image/png"),
    ("apng", "image/apng"),
    ("jpg", "image/jpeg"),
    ("jpeg", "image/jpeg"),
    ("jpe", "image/jpeg"),
    ("jfif", "image/jpeg"),
    ("gif", "image/gif"),
    ("webp", "image/webp"),
    ("avif", "image/avif"),
    ("svg", "image/svg+xml"),
    ("bmp", "image/bmp"),
    ("ico", "image/vnd.microsoft.icon"),
    ("tif", "image/tiff"),
    ("tiff", "image/tiff"),
    ("json", "application/json"),
    ("txt", "text/plain"),
    ("html", "text/html"),
];

/// Preferred extension per MIME type, for names that lack one.
const EXTENSIONS: &[(&str, &str)] = &[
    ("image/png", ".png"),
    ("image/apng", ".apng"),
    ("image/jpeg", ".jpg"),
    ("image/jpg", ".jpg"),
    ("image/pjpeg", ".jpg"),
    ("image/gif", ".gif"),
    ("image/webp", ".webp"),
    ("image/avif", ".avif"),
    ("image/svg+xml", ".svg"),
    ("image/bmp", ".bmp"),
    ("image/x-ms-bmp", ".bmp"),
    ("image/vnd.microsoft.icon", ".ico"),
    ("image/x-icon", ".ico"),
    ("image/tiff", ".tiff"),
    ("application/json", ".json"),
    ("text/plain", ".txt"),
    ("text/html", ".html"),
];

/// True if `value` is already an inline base64 image.
pub fn is_data_uri(value: &str) -> bool {
    DATA_URI_RE.is_match(value)
}

/// `type/subtype` of a Content-Type header value, lowercased, parameters dropped.
pub fn essence(content_type: &str) -> Option<String> {
    let e = content_type.split(';').next()?.trim().to_ascii_lowercase();
    if e.is_empty() || !e.contains('/') {
        None
    } else {
        Some(e)
    }
}

/// Guess a MIME type from the extension of the URL's path.
pub fn guess_from_path(url: &str) -> Option<&'static str> {
    let path = match url::Url::parse(url) {
        Ok(u) => u.path().to_string(),
        Err(_) => url.split(['?', '#']).next().unwrap_or("").to_string(),
    };
    let file = path.rsplit('/').next()?;
    let (_, ext) = file.rsplit_once('.')?;
    let ext = ext.to_ascii_lowercase();
    TYPES.iter().find(|(e, _)| *e == ext).map(|(_, m)| *m)
}

/// MIME type of a fetched image: response header, then URL extension, then octet-stream.
pub fn detect(content_type: Option<&str>, url: &str) -> String {
    content_type
        .and_then(essence)
        .or_else(|| guess_from_path(url).map(str::to_string))
        .unwrap_or_else(|| OCTET_STREAM.to_string())
}

/// File extension (with dot) for a MIME type, `.bin` when unknown.
pub fn extension_for(mime: &str) -> &'static str {
    EXTENSIONS
        .iter()
        .find(|(m, _)| *m == mime)
        .map(|(_, e)| *e)
        .unwrap_or(FALLBACK_EXTENSION)
}
