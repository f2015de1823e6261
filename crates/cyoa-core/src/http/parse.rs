//! Parse HTTP response header lines.

/// `Content-Type` of the last response in `lines`.
///
/// With redirects followed, curl reports the header block of every hop; a
/// status line (`HTTP/...`) starts a new block and discards earlier values.
pub(crate) fn content_type(lines: &[String]) -> Option<String> {
    let mut found = None;
    for line in lines {
        let line = line.trim();
        if line.starts_with("HTTP/") {
            found = None;
            continue;
        }
        if let Some((name, value)) = line.split_once(':') {
            if name.trim().eq_ignore_ascii_case("content-type") {
                let value = value.trim();
                if !value.is_empty() {
                    found = Some(value.to_string());
                }
            }
        }
    }
    found
}
