//! Language-model capability.
//!
//! The pipeline talks to the LLM through this trait so tests can substitute
//! canned responses without any network access. The production
//! implementation wraps the workspace `openai-client`.

use async_trait::async_trait;
use thiserror::Error;

use crate::costs::TokenUsage;

/// Transport or API failure from the language model.
#[derive(Debug, Error)]
#[error("llm call failed: {message}")]
pub struct LlmError {
    pub message: String,
}

impl LlmError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// One completion reply: raw text plus reported token usage.
#[derive(Debug, Clone)]
pub struct LlmReply {
    pub content: String,
    pub usage: TokenUsage,
}

/// One batch-embedding reply: vectors in input order plus token usage.
#[derive(Debug, Clone)]
pub struct EmbeddingReply {
    pub embeddings: Vec<Vec<f32>>,
    pub usage: TokenUsage,
}

/// LLM capability used by extraction, generation and the reindex worker.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Completion constrained to a strict JSON schema.
    async fn structured(
        &self,
        model: &str,
        system_prompt: &str,
        user_prompt: &str,
        schema_name: &str,
        schema: serde_json::Value,
    ) -> Result<LlmReply, LlmError>;

    /// Embed a batch of texts in a single call.
    async fn embed_batch(&self, model: &str, texts: &[String]) -> Result<EmbeddingReply, LlmError>;
}

#[async_trait]
impl LanguageModel for openai_client::OpenAIClient {
    async fn structured(
        &self,
        model: &str,
        system_prompt: &str,
        user_prompt: &str,
        schema_name: &str,
        schema: serde_json::Value,
    ) -> Result<LlmReply, LlmError> {
        let response = self
            .structured_output(model, system_prompt, user_prompt, schema_name, schema)
            .await
            .map_err(|e| LlmError::new(e.to_string()))?;

        Ok(LlmReply {
            content: response.content,
            usage: TokenUsage {
                input_tokens: response.usage.prompt_tokens,
                output_tokens: response.usage.completion_tokens,
            },
        })
    }

    async fn embed_batch(&self, model: &str, texts: &[String]) -> Result<EmbeddingReply, LlmError> {
        let response = self
            .create_embeddings(model, texts)
            .await
            .map_err(|e| LlmError::new(e.to_string()))?;

        Ok(EmbeddingReply {
            embeddings: response.embeddings,
            usage: TokenUsage {
                input_tokens: response.usage.prompt_tokens,
                output_tokens: response.usage.completion_tokens,
            },
        })
    }
}
