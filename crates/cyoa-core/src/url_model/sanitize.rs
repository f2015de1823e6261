//! Filesystem-safe image filenames.

/// Upper bound on a single path component (Linux NAME_MAX).
pub const NAME_MAX: usize = 255;

/// Longest prefix of `s` that fits in `max` bytes, cut on a char boundary.
pub fn truncate_bytes(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut take = max;
    while take > 0 && !s.is_char_boundary(take) {
        take -= 1;
    }
    &s[..take]
}

/// Sanitizes a candidate filename so it stays inside its target directory.
///
/// - Replaces NUL, `/`, `\`, and control characters with `_`
/// - Trims leading/trailing spaces and dots
/// - Limits length to 255 bytes
pub fn sanitize_filename(name: &str) -> String {
    let replaced: String = name
        .chars()
        .map(|c| {
            if c == '\0' || c == '/' || c == '\\' || c.is_control() {
                '_'
            } else {
                c
            }
        })
        .collect();

    let trimmed = replaced.trim_matches(|c| c == ' ' || c == '.');

    truncate_bytes(trimmed, NAME_MAX).to_string()
}
