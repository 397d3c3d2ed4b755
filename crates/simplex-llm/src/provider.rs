//! Provider trait — the generation capability consumed by the gateway.
//!
//! A provider opens one lazy token stream per prompt. Opening can fail on
//! its own (bad credentials, unreachable endpoint) before any token is
//! produced; stream items can fail later. The gateway treats the two
//! differently, so both surfaces return [`ProviderError`].

use std::pin::Pin;

use async_trait::async_trait;
use futures::Stream;

/// Result type alias for provider operations.
pub type ProviderResult<T> = Result<T, ProviderError>;

/// Boxed lazy sequence of generated tokens.
pub type TokenStream = Pin<Box<dyn Stream<Item = Result<String, ProviderError>> + Send>>;

/// Errors that can occur while opening or consuming a token stream.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Request or response payload could not be encoded/decoded.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Authentication failed (invalid or expired key).
    #[error("auth error: {message}")]
    Auth {
        /// Error description.
        message: String,
    },

    /// The provider API returned an error response.
    #[error("API error ({status}): {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Error description.
        message: String,
    },

    /// The stream was cancelled before completion.
    #[error("stream cancelled")]
    Cancelled,

    /// Anything else.
    #[error("{message}")]
    Other {
        /// Error description.
        message: String,
    },
}

impl ProviderError {
    /// Error category string for logging.
    #[must_use]
    pub fn category(&self) -> &'static str {
        match self {
            Self::Http(_) => "network",
            Self::Json(_) => "parse",
            Self::Auth { .. } => "auth",
            Self::Api { .. } => "api",
            Self::Cancelled => "cancelled",
            Self::Other { .. } => "other",
        }
    }
}

/// A streaming text-generation backend.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Open a token stream for `prompt`.
    ///
    /// The call itself performs the request handshake and may suspend for
    /// arbitrarily long; tokens arrive lazily on the returned stream.
    async fn open_stream(&self, prompt: &str) -> ProviderResult<TokenStream>;
}

/// Builds a [`Provider`] from credentials.
///
/// The gateway constructs a fresh provider per stream from the stored
/// configuration, and from submitted credentials during validation.
pub trait ProviderFactory: Send + Sync {
    /// Build a provider for `provider` using `api_key`.
    fn create(
        &self,
        system_prompt: &str,
        provider: &str,
        api_key: &str,
    ) -> ProviderResult<Box<dyn Provider>>;
}
