//! Gemini streaming backend (`generativelanguage.googleapis.com`).

use async_trait::async_trait;
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::provider::{Provider, ProviderError, ProviderFactory, ProviderResult, TokenStream};
use crate::sse::sse_data_lines;

/// API-key endpoint base.
const API_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Model served when a client configures the `gemini` provider.
const DEFAULT_MODEL: &str = "gemini-2.0-flash";

// ── Request / response wire types ────────────────────────────────────────────

#[derive(Serialize)]
struct GenerateRequest {
    system_instruction: SystemInstruction,
    contents: Vec<Content>,
}

#[derive(Serialize)]
struct SystemInstruction {
    parts: Vec<Part>,
}

#[derive(Serialize)]
struct Content {
    role: &'static str,
    parts: Vec<Part>,
}

#[derive(Serialize, Deserialize)]
struct Part {
    #[serde(default)]
    text: String,
}

#[derive(Deserialize)]
struct StreamChunk {
    #[serde(default)]
    candidates: Vec<Candidate>,
    error: Option<ApiError>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Deserialize)]
struct ApiError {
    #[serde(default)]
    code: u16,
    message: String,
}

// ── Provider ─────────────────────────────────────────────────────────────────

/// Streaming text generation against the Gemini API.
pub struct GeminiProvider {
    client: reqwest::Client,
    system_prompt: String,
    api_key: String,
    model: String,
}

impl GeminiProvider {
    /// Create a provider for `api_key` with the default model.
    pub fn new(system_prompt: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            system_prompt: system_prompt.into(),
            api_key: api_key.into(),
            model: DEFAULT_MODEL.to_string(),
        }
    }

    fn request_url(&self) -> String {
        format!(
            "{API_BASE_URL}/models/{}:streamGenerateContent?key={}&alt=sse",
            self.model, self.api_key
        )
    }

    fn request_body(&self, prompt: &str) -> GenerateRequest {
        GenerateRequest {
            system_instruction: SystemInstruction {
                parts: vec![Part {
                    text: self.system_prompt.clone(),
                }],
            },
            contents: vec![Content {
                role: "user",
                parts: vec![Part {
                    text: prompt.to_string(),
                }],
            }],
        }
    }
}

#[async_trait]
impl Provider for GeminiProvider {
    async fn open_stream(&self, prompt: &str) -> ProviderResult<TokenStream> {
        debug!(model = %self.model, "opening Gemini stream");

        let response = self
            .client
            .post(self.request_url())
            .json(&self.request_body(prompt))
            .send()
            .await
            .map_err(ProviderError::Http)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = parse_api_error(&body).unwrap_or(body);
            if status == reqwest::StatusCode::UNAUTHORIZED
                || status == reqwest::StatusCode::FORBIDDEN
            {
                return Err(ProviderError::Auth { message });
            }
            return Err(ProviderError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let tokens: TokenStream = Box::pin(
            sse_data_lines(Box::pin(response.bytes_stream()))
                .flat_map(|line| futures::stream::iter(parse_chunk(&line))),
        );
        Ok(tokens)
    }
}

/// Pull the text tokens (or an API error) out of one SSE chunk.
fn parse_chunk(line: &str) -> Vec<Result<String, ProviderError>> {
    let chunk: StreamChunk = match serde_json::from_str(line) {
        Ok(chunk) => chunk,
        Err(e) => {
            warn!(error = %e, "unparseable Gemini SSE chunk, skipping");
            return Vec::new();
        }
    };

    if let Some(error) = chunk.error {
        return vec![Err(ProviderError::Api {
            status: error.code,
            message: error.message,
        })];
    }

    chunk
        .candidates
        .into_iter()
        .take(1)
        .filter_map(|c| c.content)
        .flat_map(|content| content.parts)
        .filter(|part| !part.text.is_empty())
        .map(|part| Ok(part.text))
        .collect()
}

/// Extract the message from a Gemini error body, if it parses.
fn parse_api_error(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    value
        .get("error")?
        .get("message")?
        .as_str()
        .map(str::to_owned)
}

// ── Factory ──────────────────────────────────────────────────────────────────

/// Builds live provider backends from stored credentials.
#[derive(Clone, Copy, Debug, Default)]
pub struct LiveProviderFactory;

impl ProviderFactory for LiveProviderFactory {
    fn create(
        &self,
        system_prompt: &str,
        provider: &str,
        api_key: &str,
    ) -> ProviderResult<Box<dyn Provider>> {
        match provider.to_ascii_lowercase().as_str() {
            "gemini" => Ok(Box::new(GeminiProvider::new(system_prompt, api_key))),
            other => Err(ProviderError::Other {
                message: format!("unsupported provider: {other}"),
            }),
        }
    }
}
