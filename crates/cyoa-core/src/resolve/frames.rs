//! Nested frame discovery.

use once_cell::sync::Lazy;
use scraper::{Html, Selector};

static IFRAME_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("iframe").unwrap());

/// `src` of every `<iframe>` in document order; frames without one are skipped.
pub fn locate(html: &str) -> Vec<String> {
    let doc = Html::parse_document(html);
    doc.select(&IFRAME_SELECTOR)
        .filter_map(|el| el.value().attr("src"))
        .map(str::trim)
        .filter(|src| !src.is_empty())
        .map(str::to_string)
        .collect()
}
