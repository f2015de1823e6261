//! Filename extraction from URL path.

/// Last path segment of a URL, for use as a filename hint.
///
/// Returns `None` if the URL cannot be parsed or the path ends in `/`.
pub fn filename_from_url_path(url: &str) -> Option<String> {
    let parsed = url::Url::parse(url).ok()?;
    let segment = parsed.path().rsplit('/').next()?;
    if segment.is_empty() || segment == "." || segment == ".." {
        return None;
    }
    Some(segment.to_string())
}
