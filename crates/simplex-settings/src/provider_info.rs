//! Display metadata for configured providers.

use serde::{Deserialize, Serialize};

/// What the client shows for a configured provider.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderInfo {
    /// Vendor display name.
    pub vendor: String,
    /// Model display name.
    pub model: String,
    /// First characters of the API key, for "key ending in..." UI.
    pub api_key_prefix: String,
}

/// Look up display metadata for `provider`.
///
/// Unrecognized providers get a generic entry rather than an error so a
/// stale config record still renders.
#[must_use]
pub fn provider_info(provider: &str, api_key: &str) -> ProviderInfo {
    let api_key_prefix: String = api_key.chars().take(4).collect();
    if provider.eq_ignore_ascii_case("gemini") {
        ProviderInfo {
            vendor: "Google".into(),
            model: "Gemini Flash 2.0".into(),
            api_key_prefix,
        }
    } else {
        ProviderInfo {
            vendor: provider.to_uppercase(),
            model: "AI Assistant".into(),
            api_key_prefix,
        }
    }
}
