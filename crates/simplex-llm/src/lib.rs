//! # simplex-llm
//!
//! Token-stream provider abstraction for the gateway.
//!
//! Defines the [`provider::Provider`] trait every generation backend
//! implements, the [`provider::ProviderFactory`] used to build one from
//! stored credentials, a shared SSE line parser, the Gemini backend, and
//! the live API-key validation probe.

#![deny(unsafe_code)]

pub mod gemini;
pub mod provider;
pub mod sse;
pub mod validate;

pub use gemini::{GeminiProvider, LiveProviderFactory};
pub use provider::{Provider, ProviderError, ProviderFactory, ProviderResult, TokenStream};
pub use validate::validate_api_key;
