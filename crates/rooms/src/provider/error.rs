use thiserror::Error;

/// Failure modes of a status provider.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("no active network connection")]
    Offline,
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("unexpected response status: {0}")]
    BadStatus(reqwest::StatusCode),
    #[error("malformed room markup: {0}")]
    Markup(String),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("every status source failed")]
    Exhausted,
    #[error("other: {0}")]
    Other(String),
}

impl ProviderError {
    /// Whether this failure is a connectivity problem (no network, timeout,
    /// non-2xx response) rather than a response the provider could not make
    /// sense of. Connectivity failures are the ones a fallback chain keeps.
    pub fn is_connectivity(&self) -> bool {
        matches!(
            self,
            ProviderError::Offline
                | ProviderError::Http(_)
                | ProviderError::BadStatus(_)
                | ProviderError::Exhausted
        )
    }
}
