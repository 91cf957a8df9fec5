// ABOUTME: Structured errors for outbound calls to the activity provider
// ABOUTME: Distinguishes retryable conditions (rate limit, 5xx) from terminal ones (4xx, parse)

use thiserror::Error;

/// Everything that can go wrong talking to the activity provider.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The request never reached the provider (DNS, connect, TLS, timeout).
    #[error("network error calling {provider}: {source}")]
    Network {
        /// Provider name, e.g. `"strava"`.
        provider: &'static str,
        /// Underlying transport error.
        #[source]
        source: reqwest::Error,
    },

    /// The provider responded with a non-2xx status the client doesn't retry.
    #[error("{provider} API error {status_code}: {message}")]
    Api {
        /// Provider name.
        provider: &'static str,
        /// HTTP status code.
        status_code: u16,
        /// Provider-supplied or synthesised error message.
        message: String,
        /// Whether a caller could reasonably retry this exact call.
        retryable: bool,
    },

    /// A provider response could not be decoded into the expected wire shape.
    #[error("failed to parse {provider} response field `{field}`: {source}")]
    Parse {
        /// Provider name.
        provider: &'static str,
        /// The field or response shape that failed to parse.
        field: &'static str,
        /// Underlying deserialisation error.
        #[source]
        source: serde_json::Error,
    },

    /// The provider's rate limit window is exhausted.
    #[error("{provider} rate limit exceeded ({limit_type}); retry after {retry_after_secs}s")]
    RateLimitExceeded {
        /// Provider name.
        provider: &'static str,
        /// Seconds until the window resets.
        retry_after_secs: u64,
        /// Which window was exhausted (`"short"` or `"daily"`).
        limit_type: &'static str,
    },

    /// No token is on file for this user and no cross-service resolver found one either.
    #[error("user {user_id} is not connected to {provider}")]
    NotAuthenticated {
        /// Provider name.
        provider: &'static str,
        /// The user who lacks a usable token.
        user_id: uuid::Uuid,
    },

    /// The provider's OAuth2 token endpoint rejected a refresh attempt.
    #[error("token refresh failed for {provider}: {message}")]
    RefreshFailed {
        /// Provider name.
        provider: &'static str,
        /// Provider-supplied error description.
        message: String,
    },
}

impl ProviderError {
    /// Whether a caller could reasonably retry the exact call that produced this error.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Network { .. } | Self::RateLimitExceeded { .. } => true,
            Self::Api { retryable, .. } => *retryable,
            Self::Parse { .. } | Self::NotAuthenticated { .. } | Self::RefreshFailed { .. } => false,
        }
    }
}
