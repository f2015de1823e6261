//! Locate image references in project text.

use std::ops::Range;

use once_cell::sync::Lazy;
use regex::Regex;

/// `"image":"<value>"`, field name matched case-insensitively.
static IMAGE_FIELD_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)"image":"([^"]+)""#).unwrap());

/// One `"image":"<value>"` match: the raw value and its byte span in the text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageOccurrence {
    pub value: String,
    /// Span of `value` only; the field name and quotes stay outside it.
    pub span: Range<usize>,
}

/// Every image occurrence in `text`, in order of appearance.
pub fn scan(text: &str) -> Vec<ImageOccurrence> {
    IMAGE_FIELD_RE
        .captures_iter(text)
        .filter_map(|c| c.get(1))
        .map(|m| ImageOccurrence {
            value: m.as_str().to_string(),
            span: m.range(),
        })
        .collect()
}

/// Copy of `text` with each occurrence's value replaced where `replacements`
/// has `Some`. `replacements` is indexed like `occurrences`.
pub fn rewrite(text: &str, occurrences: &[ImageOccurrence], replacements: &[Option<String>]) -> String {
    let mut out = String::with_capacity(text.len());
    let mut cursor = 0;
    for (occ, replacement) in occurrences.iter().zip(replacements) {
        if let Some(new_value) = replacement {
            out.push_str(&text[cursor..occ.span.start]);
            out.push_str(new_value);
            cursor = occ.span.end;
        }
    }
    out.push_str(&text[cursor..]);
    out
}
