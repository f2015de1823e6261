//! Source resolution: find the project JSON behind a page URL.
//!
//! A visit to one URL runs a fixed, ordered list of strategies and stops at
//! the first that finds something:
//!
//! 1. default location: `HEAD <dir>/project.json`
//! 2. embedded scripts: URLs named in the page's scripts, the page's own
//!    `project.json`, then an inline store payload
//! 3. nested frames: each `<iframe>` visited one level deeper
//!
//! Depth is checked before anything else on every visit, so a chain of frames
//! cannot recurse past `max_depth`.

pub mod frames;
mod gateway;
pub mod payload;
pub mod scripts;

pub use gateway::Gateway;
pub use scripts::ScriptHarvester;

use tracing::{debug, error, info, warn};

use crate::control::AbortToken;
use crate::error::CyoaError;
use crate::http::Fetcher;
use crate::url_model;

/// Default nesting limit for frame recursion.
pub const DEFAULT_MAX_DEPTH: u32 = 3;

/// Name of the project file next to a page.
const PROJECT_FILE: &str = "project.json";

/// One URL to visit and how deep in the frame chain it sits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolutionRequest {
    pub url: String,
    pub depth: u32,
}

impl ResolutionRequest {
    pub fn root(url: &str) -> Self {
        Self {
            url: url.to_string(),
            depth: 0,
        }
    }

    fn nested(&self, url: String) -> Self {
        Self {
            url,
            depth: self.depth + 1,
        }
    }
}

/// Recovered project JSON and the URL it was found relative to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawSource {
    text: String,
    project_url: String,
    base_url: String,
}

impl RawSource {
    fn new(text: String, project_url: &str) -> Result<Self, CyoaError> {
        Ok(Self {
            base_url: url_model::directory_of(project_url)?,
            project_url: project_url.to_string(),
            text,
        })
    }

    /// Text as recovered, including any wrapper around the JSON.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// The URL the project was found at (file or page).
    pub fn project_url(&self) -> &str {
        &self.project_url
    }

    /// Directory that relative image references resolve against.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// The span from the first `{` to the last `}`; empty if there is none.
    pub fn json_block(&self) -> &str {
        match (self.text.find('{'), self.text.rfind('}')) {
            (Some(start), Some(end)) if start < end => &self.text[start..=end],
            _ => "",
        }
    }
}

/// Outcome of one visit or one strategy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Found(RawSource),
    NotFound,
}

/// Tuning for a resolver.
#[derive(Debug, Clone)]
pub struct ResolverOptions {
    pub max_depth: u32,
    pub gateway: Gateway,
    pub abort: AbortToken,
}

impl Default for ResolverOptions {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            gateway: Gateway::default(),
            abort: AbortToken::new(),
        }
    }
}

/// Per-visit state shared by the strategies. The page and the known-location
/// check are fetched at most once.
struct Visit {
    request: ResolutionRequest,
    url: String,
    page: Option<Option<String>>,
    known_location: Option<Option<String>>,
}

impl Visit {
    fn new(request: ResolutionRequest, url: String) -> Self {
        Self {
            request,
            url,
            page: None,
            known_location: None,
        }
    }

    fn page(&mut self, r: &SourceResolver<'_>) -> Result<Option<String>, CyoaError> {
        if self.page.is_none() {
            self.page = Some(r.fetch_text(&self.url)?);
        }
        Ok(self.page.clone().flatten())
    }

    fn known_location(&mut self, r: &SourceResolver<'_>) -> Result<Option<String>, CyoaError> {
        if self.known_location.is_none() {
            info!("checking known locations");
            let url = url_model::join_concat(&self.url, PROJECT_FILE);
            self.known_location = Some(r.fetch_text(&url)?);
        }
        Ok(self.known_location.clone().flatten())
    }
}

type Strategy = fn(&SourceResolver<'_>, &mut Visit) -> Result<Resolution, CyoaError>;

/// Strategies in priority order.
const STRATEGIES: &[(&str, Strategy)] = &[
    ("default-location", default_location),
    ("embedded-scripts", embedded_scripts),
    ("nested-frames", nested_frames),
];

/// Depth-bounded search for a project's JSON.
pub struct SourceResolver<'a> {
    fetcher: &'a dyn Fetcher,
    options: ResolverOptions,
}

impl<'a> SourceResolver<'a> {
    pub fn new(fetcher: &'a dyn Fetcher, options: ResolverOptions) -> Self {
        Self { fetcher, options }
    }

    /// Find the project behind `url`.
    ///
    /// Exhausting every strategy yields `CyoaError::NotFound`. Gateway failures
    /// and aborts are returned as they happen.
    pub fn resolve(&self, url: &str) -> Result<RawSource, CyoaError> {
        match self.resolve_request(ResolutionRequest::root(url))? {
            Resolution::Found(source) => Ok(source),
            Resolution::NotFound => Err(CyoaError::NotFound(url.to_string())),
        }
    }

    /// One visit: depth guard, gateway rewrite, then each strategy in order.
    pub fn resolve_request(&self, request: ResolutionRequest) -> Result<Resolution, CyoaError> {
        if request.depth > self.options.max_depth {
            warn!(depth = request.depth, "max recursion depth reached at {}", request.url);
            return Ok(Resolution::NotFound);
        }
        self.options.abort.check()?;

        let url = if self.options.gateway.matches(&request.url) {
            warn!("gateway link detected, looking up the real url");
            let real = self.options.gateway.resolve(self.fetcher, &request.url)?;
            info!("corrected url: {}", real);
            real
        } else {
            request.url.clone()
        };

        info!(depth = request.depth, "checking {}", url);
        let mut visit = Visit::new(request, url);
        for (name, strategy) in STRATEGIES {
            match strategy(self, &mut visit)? {
                Resolution::Found(source) => {
                    info!(strategy = *name, "found project file at {}", source.project_url());
                    return Ok(Resolution::Found(source));
                }
                Resolution::NotFound => debug!(strategy = *name, "nothing found at {}", visit.url),
            }
        }
        Ok(Resolution::NotFound)
    }

    /// GET as text; recoverable failures are logged and become `None`.
    fn fetch_text(&self, url: &str) -> Result<Option<String>, CyoaError> {
        self.options.abort.check()?;
        match self.fetcher.get_text(url).map_err(CyoaError::from) {
            Ok(text) => {
                info!("downloaded source from {}", url);
                Ok(Some(text))
            }
            Err(e) if e.is_recoverable() => {
                error!("error downloading {}: {}", url, e);
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    fn found(&self, text: String, project_url: &str) -> Result<Resolution, CyoaError> {
        match RawSource::new(text, project_url) {
            Ok(source) => Ok(Resolution::Found(source)),
            Err(e) => {
                warn!("discarding result with unusable url: {}", e);
                Ok(Resolution::NotFound)
            }
        }
    }
}

/// `project.json` in the page's directory, if HEAD says it exists.
fn default_location(r: &SourceResolver<'_>, visit: &mut Visit) -> Result<Resolution, CyoaError> {
    let dir = match url_model::directory_of(&visit.url) {
        Ok(dir) => dir,
        Err(e) => {
            warn!("{}", e);
            return Ok(Resolution::NotFound);
        }
    };
    let candidate = format!("{dir}{PROJECT_FILE}");
    r.options.abort.check()?;
    if !r.fetcher.exists(&candidate) {
        return Ok(Resolution::NotFound);
    }
    match r.fetch_text(&candidate)? {
        Some(text) => r.found(text, &dir),
        None => Ok(Resolution::NotFound),
    }
}

/// Project URLs or payloads found in the page's scripts.
fn embedded_scripts(r: &SourceResolver<'_>, visit: &mut Visit) -> Result<Resolution, CyoaError> {
    let Some(html) = visit.page(r)? else {
        return Ok(Resolution::NotFound);
    };
    let dir = match url_model::directory_of(&visit.url) {
        Ok(dir) => dir,
        Err(e) => {
            warn!("{}", e);
            return Ok(Resolution::NotFound);
        }
    };
    let scripts = ScriptHarvester::new(r.fetcher, &r.options.abort).harvest(&html, &dir)?;
    debug!(count = scripts.len(), "harvested scripts from {}", visit.url);

    for script in &scripts {
        for candidate in payload::candidate_urls(script) {
            let full = url_model::join_concat(&visit.url, &candidate);
            if let Some(text) = r.fetch_text(&full)? {
                return r.found(text, &visit.url);
            }
        }

        if let Some(text) = visit.known_location(r)? {
            let at = url_model::join_concat(&visit.url, PROJECT_FILE);
            return r.found(text, &at);
        }

        info!("file not found, looking for embedded project");
        if let Some(inline) = payload::inline_store(script) {
            info!("found embedded project");
            return r.found(inline.to_string(), &visit.url);
        }
    }
    Ok(Resolution::NotFound)
}

/// Each frame of the page, one level deeper; first success wins.
fn nested_frames(r: &SourceResolver<'_>, visit: &mut Visit) -> Result<Resolution, CyoaError> {
    let Some(html) = visit.page(r)? else {
        return Ok(Resolution::NotFound);
    };
    info!("failed to find embedded project, looking for iframes");
    let page = url::Url::parse(&visit.url).ok();
    for src in frames::locate(&html) {
        let frame_url = match page.as_ref().and_then(|p| p.join(&src).ok()) {
            Some(u) => u.to_string(),
            None => src,
        };
        info!("checking iframe: {}", frame_url);
        if let Resolution::Found(source) = r.resolve_request(visit.request.nested(frame_url))? {
            return Ok(Resolution::Found(source));
        }
    }
    Ok(Resolution::NotFound)
}
