//! Error taxonomy shared by the resolver and the image pipeline.

use crate::http::FetchError;

/// Errors surfaced by the core.
///
/// Resolution strategies recover `NotFound`, `Network` and `RateLimited`
/// locally; `MalformedInput` from the gateway, `Config` and `Aborted`
/// terminate the operation that raised them.
#[derive(Debug, thiserror::Error)]
pub enum CyoaError {
    /// Transport failure or a non-success status other than 429.
    #[error("network error: {0}")]
    Network(String),
    /// The server answered HTTP 429.
    #[error("rate limited: {0}")]
    RateLimited(String),
    /// No strategy found a project file.
    #[error("no project found at {0}")]
    NotFound(String),
    /// Input did not have the expected shape (gateway URL, API body).
    #[error("malformed input: {0}")]
    MalformedInput(String),
    /// Invalid caller configuration.
    #[error("configuration error: {0}")]
    Config(String),
    /// Operation stopped through its abort token.
    #[error("operation aborted")]
    Aborted,
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

impl CyoaError {
    /// True when a resolution strategy may swallow this error and fall through.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            CyoaError::Network(_) | CyoaError::RateLimited(_) | CyoaError::NotFound(_)
        )
    }
}

impl From<FetchError> for CyoaError {
    fn from(e: FetchError) -> Self {
        match e {
            FetchError::Aborted => CyoaError::Aborted,
            FetchError::Http(429) => CyoaError::RateLimited("HTTP 429".to_string()),
            other => CyoaError::Network(other.to_string()),
        }
    }
}
