//! Pure OpenAI REST API client
//!
//! A minimal client for the OpenAI API with no domain-specific logic.
//! Supports chat completions, strict JSON-schema structured outputs, and
//! batch embeddings. Every call reports actual token usage so callers can
//! meter cost.
//!
//! # Example
//!
//! ```rust,ignore
//! use openai_client::{OpenAIClient, ChatRequest, Message};
//!
//! let client = OpenAIClient::from_env()?;
//!
//! let response = client
//!     .chat_completion(ChatRequest::new("gpt-4o").message(Message::user("Hello!")))
//!     .await?;
//! ```
//!
//! # Type-Safe Structured Output
//!
//! ```rust,ignore
//! use schemars::JsonSchema;
//! use serde::Deserialize;
//!
//! #[derive(Deserialize, JsonSchema)]
//! struct Verdict {
//!     label: String,
//!     confidence: f32,
//! }
//!
//! // Schema generated automatically from the type.
//! let (verdict, usage) = client
//!     .extract::<Verdict>("gpt-4o", system_prompt, user_prompt)
//!     .await?;
//! ```

pub mod error;
pub mod schema;
pub mod types;

pub use error::{OpenAIError, Result};
pub use schema::StructuredOutput;
pub use types::*;

use reqwest::Client;
use tracing::{debug, warn};

/// Pure OpenAI API client.
#[derive(Clone)]
pub struct OpenAIClient {
    http_client: Client,
    api_key: String,
    base_url: String,
}

impl OpenAIClient {
    /// Create a new OpenAI client with the given API key.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            http_client: Client::new(),
            api_key: api_key.into(),
            base_url: "https://api.openai.com/v1".to_string(),
        }
    }

    /// Create from environment variable `OPENAI_API_KEY`.
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| OpenAIError::Config("OPENAI_API_KEY not set".into()))?;
        Ok(Self::new(api_key))
    }

    /// Set a custom base URL (for Azure, proxies, etc.).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Get the base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Chat completion.
    pub async fn chat_completion(&self, request: ChatRequest) -> Result<ChatResponse> {
        let start = std::time::Instant::now();

        let response = self
            .http_client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                warn!(error = %e, "OpenAI request failed");
                OpenAIError::Network(e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            warn!(status = %status, error = %error_text, "OpenAI API error");
            return Err(OpenAIError::Api(format!("OpenAI API error: {}", error_text)));
        }

        let raw: types::ChatResponseRaw = response
            .json()
            .await
            .map_err(|e| OpenAIError::Parse(e.to_string()))?;

        let usage = raw.usage.unwrap_or_default();
        let content = raw
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| OpenAIError::Api("No response from OpenAI".into()))?;

        debug!(
            model = %request.model,
            duration_ms = start.elapsed().as_millis(),
            prompt_tokens = usage.prompt_tokens,
            completion_tokens = usage.completion_tokens,
            "OpenAI chat completion"
        );

        Ok(ChatResponse { content, usage })
    }

    /// Structured output with an explicit JSON schema.
    ///
    /// Returns the raw JSON text of the response plus token usage. Prefer
    /// [`extract`](Self::extract) when a Rust type is available.
    pub async fn structured_output(
        &self,
        model: &str,
        system_prompt: impl Into<String>,
        user_prompt: impl Into<String>,
        schema_name: &str,
        schema: serde_json::Value,
    ) -> Result<ChatResponse> {
        let request = ChatRequest::new(model)
            .message(Message::system(system_prompt))
            .message(Message::user(user_prompt))
            .temperature(0.0)
            .json_schema(schema_name, schema);

        self.chat_completion(request).await
    }

    /// Type-safe structured output extraction.
    ///
    /// Generates a JSON schema from `T` via `schemars`, sends it as a strict
    /// `json_schema` response format, and deserializes the reply.
    pub async fn extract<T: StructuredOutput>(
        &self,
        model: &str,
        system_prompt: impl Into<String>,
        user_prompt: impl Into<String>,
    ) -> Result<(T, Usage)> {
        let schema = T::openai_schema();

        debug!(
            type_name = %T::type_name(),
            model = model,
            "generated OpenAI schema for extraction"
        );

        let response = self
            .structured_output(model, system_prompt, user_prompt, &T::type_name(), schema)
            .await?;

        let value: T = serde_json::from_str(&response.content)
            .map_err(|e| OpenAIError::Parse(format!("failed to deserialize response: {}", e)))?;

        Ok((value, response.usage))
    }

    /// Batch embeddings: one vector per input text, in input order.
    pub async fn create_embeddings(
        &self,
        model: &str,
        inputs: &[String],
    ) -> Result<EmbeddingResponse> {
        let request = types::EmbeddingRequest {
            model: model.to_string(),
            input: inputs.to_vec(),
        };

        let response = self
            .http_client
            .post(format!("{}/embeddings", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                warn!(error = %e, "OpenAI embedding request failed");
                OpenAIError::Network(e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            warn!(status = %status, error = %error_text, "OpenAI embedding error");
            return Err(OpenAIError::Api(format!(
                "OpenAI embedding error: {}",
                error_text
            )));
        }

        let mut raw: types::EmbeddingResponseRaw = response
            .json()
            .await
            .map_err(|e| OpenAIError::Parse(e.to_string()))?;

        // Entries carry an explicit index; order by it rather than trusting
        // response order.
        raw.data.sort_by_key(|d| d.index);

        if raw.data.len() != inputs.len() {
            return Err(OpenAIError::Api(format!(
                "expected {} embeddings, got {}",
                inputs.len(),
                raw.data.len()
            )));
        }

        Ok(EmbeddingResponse {
            embeddings: raw.data.into_iter().map(|d| d.embedding).collect(),
            usage: raw.usage.unwrap_or_default(),
        })
    }
}
