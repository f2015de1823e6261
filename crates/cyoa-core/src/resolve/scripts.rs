//! Script harvesting: every script body a page runs, in document order.

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};
use tracing::{debug, error};

use crate::control::AbortToken;
use crate::error::CyoaError;
use crate::http::Fetcher;
use crate::url_model;

static SCRIPT_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("script").unwrap());

/// Path of the app bundle a loader script injects.
static APP_JS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r#"js/app\.[^'"]+\.js"#).unwrap());

/// Text that marks a script as creating elements at runtime.
const DYNAMIC_LOADER_MARKER: &str = "document.createElement";

/// Where a script's body comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptSource {
    /// Inline loader that injects another script; carries the bundle path if one was found.
    Loader(Option<String>),
    /// `<script src=...>`.
    External(String),
    /// Inline body, possibly empty.
    Inline(String),
}

/// Classify every `<script>` of `html` in document order. No network access.
pub fn scan(html: &str) -> Vec<ScriptSource> {
    let doc = Html::parse_document(html);
    doc.select(&SCRIPT_SELECTOR)
        .map(|el| {
            let outer = el.html();
            if outer.contains(DYNAMIC_LOADER_MARKER) {
                ScriptSource::Loader(APP_JS_RE.find(&outer).map(|m| m.as_str().to_string()))
            } else if let Some(src) = el.value().attr("src").filter(|s| !s.trim().is_empty()) {
                ScriptSource::External(src.trim().to_string())
            } else {
                ScriptSource::Inline(el.text().collect())
            }
        })
        .collect()
}

/// Produces the ordered list of script bodies a page references or embeds.
pub struct ScriptHarvester<'a> {
    fetcher: &'a dyn Fetcher,
    abort: &'a AbortToken,
}

impl<'a> ScriptHarvester<'a> {
    pub fn new(fetcher: &'a dyn Fetcher, abort: &'a AbortToken) -> Self {
        Self { fetcher, abort }
    }

    /// Script bodies of `html`. Relative sources are joined onto `base_url`.
    ///
    /// Scripts that fail to download are logged and left out; only an abort
    /// stops the harvest.
    pub fn harvest(&self, html: &str, base_url: &str) -> Result<Vec<String>, CyoaError> {
        let mut bodies = Vec::new();
        for source in scan(html) {
            let src = match source {
                ScriptSource::Inline(body) => {
                    bodies.push(body);
                    continue;
                }
                ScriptSource::External(src) => src,
                ScriptSource::Loader(Some(path)) => path,
                ScriptSource::Loader(None) => {
                    debug!("loader script without an app bundle path; skipping");
                    continue;
                }
            };
            self.abort.check()?;
            let url = url_model::join_concat(base_url, &src);
            match self.fetcher.get_text(&url).map_err(CyoaError::from) {
                Ok(body) => bodies.push(body),
                Err(e) if e.is_recoverable() => error!("failed to fetch script {}: {}", url, e),
                Err(e) => return Err(e),
            }
        }
        Ok(bodies)
    }
}
