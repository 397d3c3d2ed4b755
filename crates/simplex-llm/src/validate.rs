//! Live API-key validation.
//!
//! Credentials are validated the same way they will be used: open a real
//! token stream for a tiny prompt and wait for the first token. There is no
//! offline format check; the provider is the source of truth.

use futures::StreamExt;
use tracing::debug;

use crate::provider::ProviderFactory;

/// System prompt used for the validation probe.
const VALIDATION_SYSTEM_PROMPT: &str = "You are an expert software developer";

/// Probe prompt; one token of any response proves the key works.
const VALIDATION_PROMPT: &str = "hello";

/// Check `provider`/`api_key` by opening a one-token test stream.
///
/// Returns `(true, "")` on success and `(false, message)` on any failure.
/// A stream that ends without producing a token still counts as valid; the
/// handshake itself succeeded.
pub async fn validate_api_key(
    factory: &dyn ProviderFactory,
    provider: &str,
    api_key: &str,
) -> (bool, String) {
    let backend = match factory.create(VALIDATION_SYSTEM_PROMPT, provider, api_key) {
        Ok(backend) => backend,
        Err(e) => return (false, e.to_string()),
    };

    let mut stream = match backend.open_stream(VALIDATION_PROMPT).await {
        Ok(stream) => stream,
        Err(e) => return (false, e.to_string()),
    };

    loop {
        match stream.next().await {
            Some(Ok(token)) if !token.is_empty() => {
                debug!(provider, "validation probe got a token");
                return (true, String::new());
            }
            Some(Ok(_)) => {}
            Some(Err(e)) => return (false, e.to_string()),
            None => return (true, String::new()),
        }
    }
}
