//! Textual extraction of the project location or payload from bundled JS.
//!
//! The scraped sites ship a minified, library-specific store initializer, so
//! these patterns and markers are matched literally. When a site changes its
//! bundle, only this file should need to change.

use once_cell::sync::Lazy;
use regex::Regex;

/// Marker that opens an inline project store.
pub const INLINE_STORE_START: &str = "Store({state:{app:";
/// Marker that closes an inline project store.
pub const INLINE_STORE_END: &str = "},getters";

/// `$store.commit("loadApp", ...)` immediately followed by the XHR that loads the project.
static LOAD_APP_OPEN_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"\$store\.commit\("loadApp",.*?\)\}\},e\.open\("GET","(.*?)",!0\)"#).unwrap()
});

/// Any `e.open("GET", "<url>"` call, either quote style.
static GET_OPEN_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"e\.open\(\s*["']GET["']\s*,\s*["']([^"']+)["']"#).unwrap()
});

/// Which textual pattern produced the candidates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatternVariant {
    /// Store commit paired with the network open call.
    LoadAppCommit,
    /// Bare `open("GET", ...)` call.
    GetOpen,
}

impl PatternVariant {
    fn regex(self) -> &'static Regex {
        match self {
            PatternVariant::LoadAppCommit => &LOAD_APP_OPEN_RE,
            PatternVariant::GetOpen => &GET_OPEN_RE,
        }
    }

    /// All captured URLs, in order of appearance.
    pub fn captures(self, script: &str) -> Vec<String> {
        self.regex()
            .captures_iter(script)
            .filter_map(|c| c.get(1))
            .map(|m| m.as_str().to_string())
            .collect()
    }
}

/// Candidate project-file URLs in `script`.
///
/// The store-commit pattern wins when it matches at all; the bare open call
/// is only consulted otherwise.
pub fn candidate_urls(script: &str) -> Vec<String> {
    let preferred = PatternVariant::LoadAppCommit.captures(script);
    if !preferred.is_empty() {
        return preferred;
    }
    PatternVariant::GetOpen.captures(script)
}

/// Inline project JSON between the store markers.
///
/// Takes the text after the last start marker up to the first end marker that
/// follows it.
pub fn inline_store(script: &str) -> Option<&str> {
    let start = script.rfind(INLINE_STORE_START)? + INLINE_STORE_START.len();
    let rest = &script[start..];
    let end = rest.find(INLINE_STORE_END)?;
    Some(&rest[..end])
}
