use thiserror::Error;

/// Errors surfaced by the connection adapter.
///
/// Upstream application failures are deliberately not represented here: a
/// non-200 response still carries a JSON body (with its own `cod` field), and
/// that body is returned to the caller untouched.
#[derive(Debug, Error)]
pub enum WeatherError {
    /// No AppID was supplied explicitly and none was found in secrets.
    /// Raised at construction time; the connection is unusable.
    #[error("AppID/API key not provided explicitly or in secrets")]
    MissingCredential,

    /// Transport-level failure from the HTTP client, propagated as-is.
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The secrets file exists but could not be read or parsed.
    #[error("failed to load secrets: {0}")]
    Secrets(anyhow::Error),

    /// A computation shared through the cache failed for a caller that no
    /// longer exclusively owns the original error.
    #[error("cache error: {0}")]
    Cache(String),
}
