//! Shared service context injected into frame handling.

use std::sync::Arc;

use simplex_llm::provider::ProviderFactory;
use simplex_settings::store::ConfigStore;

/// System prompt used for chat generations.
pub const SYSTEM_PROMPT: &str = "You are a helpful AI assistant.";

/// Services shared by every connection.
///
/// Passed by reference into the dispatcher and stream runners; nothing in
/// here is global state, so tests can wire their own stores and factories.
#[derive(Clone)]
pub struct SessionContext {
    /// Persisted AI configuration.
    pub config: Arc<ConfigStore>,
    /// Builds generation backends from stored or submitted credentials.
    pub providers: Arc<dyn ProviderFactory>,
    /// System prompt handed to every generation backend.
    pub system_prompt: String,
}

impl SessionContext {
    /// Context with the default system prompt.
    pub fn new(config: Arc<ConfigStore>, providers: Arc<dyn ProviderFactory>) -> Self {
        Self {
            config,
            providers,
            system_prompt: SYSTEM_PROMPT.to_string(),
        }
    }
}
