//! Testing utilities including mock implementations.
//!
//! Useful for exercising the pipeline without network access, real LLM
//! calls, or a vector index. Mocks record their calls so tests can assert
//! on interaction shape, not just results.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::RwLock;

use async_trait::async_trait;

use crate::ai::{EmbeddingReply, LanguageModel, LlmError, LlmReply};
use crate::costs::TokenUsage;
use crate::error::{QueueError, VectorizeError};
use crate::http::{HttpError, HttpFetch};
use crate::queue::{JobQueue, QueuedJob};
use crate::vector::{VectorIndex, VectorRecord};

// ============================================================================
// HTTP
// ============================================================================

/// Canned-page HTTP capability. Unknown URLs return HTTP 404.
#[derive(Default)]
pub struct MockHttp {
    pages: RwLock<HashMap<String, String>>,
}

impl MockHttp {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `body` for `url`.
    pub fn with_page(self, url: impl Into<String>, body: impl Into<String>) -> Self {
        {
            let mut pages = self.pages.write().unwrap_or_else(|e| e.into_inner());
            pages.insert(url.into(), body.into());
        }
        self
    }
}

#[async_trait]
impl HttpFetch for MockHttp {
    async fn get_text(&self, url: &str) -> Result<String, HttpError> {
        let pages = self.pages.read().unwrap_or_else(|e| e.into_inner());
        pages.get(url).cloned().ok_or(HttpError::Status {
            url: url.to_string(),
            status: 404,
        })
    }
}

// ============================================================================
// Language model
// ============================================================================

/// Record of one mock LLM call.
#[derive(Debug, Clone)]
pub enum MockLlmCall {
    Structured { model: String, schema_name: String },
    EmbedBatch { model: String, count: usize },
}

/// Deterministic language model double.
///
/// Structured responses are keyed by schema name; a default response covers
/// the rest. Embeddings are fixed-dimension vectors derived from text
/// length, so equal texts embed equally.
#[derive(Default)]
pub struct MockLanguageModel {
    responses: RwLock<HashMap<String, String>>,
    default_response: RwLock<Option<String>>,
    embedding_dim: usize,
    fail_embeddings: AtomicU32,
    calls: RwLock<Vec<MockLlmCall>>,
}

impl MockLanguageModel {
    pub fn new() -> Self {
        Self {
            embedding_dim: 8,
            ..Default::default()
        }
    }

    /// Canned response for one schema name.
    pub fn with_response(self, schema_name: impl Into<String>, json: impl Into<String>) -> Self {
        {
            let mut responses = self.responses.write().unwrap_or_else(|e| e.into_inner());
            responses.insert(schema_name.into(), json.into());
        }
        self
    }

    /// Canned response for any schema without a specific one.
    pub fn with_default_response(self, json: impl Into<String>) -> Self {
        {
            let mut default = self
                .default_response
                .write()
                .unwrap_or_else(|e| e.into_inner());
            *default = Some(json.into());
        }
        self
    }

    /// Make every embed call fail.
    pub fn with_failing_embeddings(self) -> Self {
        self.fail_embeddings.store(u32::MAX, Ordering::SeqCst);
        self
    }

    /// Calls made so far.
    pub fn calls(&self) -> Vec<MockLlmCall> {
        self.calls
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Count of structured calls (extraction + generation).
    pub fn structured_call_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|call| matches!(call, MockLlmCall::Structured { .. }))
            .count()
    }
}

#[async_trait]
impl LanguageModel for MockLanguageModel {
    async fn structured(
        &self,
        model: &str,
        _system_prompt: &str,
        _user_prompt: &str,
        schema_name: &str,
        _schema: serde_json::Value,
    ) -> Result<LlmReply, LlmError> {
        self.calls
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .push(MockLlmCall::Structured {
                model: model.to_string(),
                schema_name: schema_name.to_string(),
            });

        let content = {
            let responses = self.responses.read().unwrap_or_else(|e| e.into_inner());
            match responses.get(schema_name) {
                Some(response) => response.clone(),
                None => self
                    .default_response
                    .read()
                    .unwrap_or_else(|e| e.into_inner())
                    .clone()
                    .ok_or_else(|| {
                        LlmError::new(format!("no mock response for schema {}", schema_name))
                    })?,
            }
        };

        Ok(LlmReply {
            content,
            usage: TokenUsage {
                input_tokens: 120,
                output_tokens: 40,
            },
        })
    }

    async fn embed_batch(&self, model: &str, texts: &[String]) -> Result<EmbeddingReply, LlmError> {
        self.calls
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .push(MockLlmCall::EmbedBatch {
                model: model.to_string(),
                count: texts.len(),
            });

        if self.fail_embeddings.load(Ordering::SeqCst) > 0 {
            return Err(LlmError::new("injected embedding failure"));
        }

        let embeddings = texts
            .iter()
            .map(|text| {
                let mut vector = vec![0.0_f32; self.embedding_dim];
                vector[0] = text.len() as f32;
                vector
            })
            .collect();

        Ok(EmbeddingReply {
            embeddings,
            usage: TokenUsage {
                input_tokens: texts.iter().map(|t| t.len() as u32 / 4).sum(),
                output_tokens: 0,
            },
        })
    }
}

// ============================================================================
// Vector index
// ============================================================================

/// Call-recording vector index with failure injection.
#[derive(Default)]
pub struct MockVectorIndex {
    upserts: RwLock<Vec<Vec<VectorRecord>>>,
    deletes: RwLock<Vec<Vec<String>>>,
    failing_deletes: AtomicU32,
    failing_upserts: AtomicU32,
}

impl MockVectorIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the next `count` delete calls (`u32::MAX` for always).
    pub fn with_failing_deletes(self, count: u32) -> Self {
        self.failing_deletes.store(count, Ordering::SeqCst);
        self
    }

    /// Fail the next `count` upsert calls (`u32::MAX` for always).
    pub fn with_failing_upserts(self, count: u32) -> Self {
        self.failing_upserts.store(count, Ordering::SeqCst);
        self
    }

    /// Every delete call made, in order.
    pub fn delete_calls(&self) -> Vec<Vec<String>> {
        self.deletes
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Every upsert call made, in order.
    pub fn upsert_calls(&self) -> Vec<Vec<VectorRecord>> {
        self.upserts
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    fn should_fail(counter: &AtomicU32) -> bool {
        let current = counter.load(Ordering::SeqCst);
        if current == 0 {
            return false;
        }
        if current != u32::MAX {
            counter.store(current - 1, Ordering::SeqCst);
        }
        true
    }
}

#[async_trait]
impl VectorIndex for MockVectorIndex {
    async fn upsert(&self, records: &[VectorRecord]) -> Result<(), VectorizeError> {
        self.upserts
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .push(records.to_vec());

        if Self::should_fail(&self.failing_upserts) {
            return Err(VectorizeError::upsert("injected upsert failure"));
        }
        Ok(())
    }

    async fn delete(&self, ids: &[String]) -> Result<(), VectorizeError> {
        self.deletes
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .push(ids.to_vec());

        if Self::should_fail(&self.failing_deletes) {
            return Err(VectorizeError::delete("injected delete failure"));
        }
        Ok(())
    }
}

// ============================================================================
// Queue
// ============================================================================

/// Call-recording job queue.
#[derive(Default)]
pub struct MockQueue {
    sent: RwLock<Vec<QueuedJob>>,
}

impl MockQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drain everything sent so far.
    pub fn take_jobs(&self) -> Vec<QueuedJob> {
        let mut sent = self.sent.write().unwrap_or_else(|e| e.into_inner());
        std::mem::take(&mut *sent)
    }

    /// Sent envelopes of one job type, without draining.
    pub fn jobs_of_type(&self, job_type: &str) -> Vec<serde_json::Value> {
        self.sent
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .filter(|job| job.job_type == job_type)
            .map(|job| job.body.clone())
            .collect()
    }
}

#[async_trait]
impl JobQueue for MockQueue {
    async fn send(&self, job: QueuedJob) -> Result<(), QueueError> {
        self.sent
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .push(job);
        Ok(())
    }

    async fn send_batch(&self, jobs: Vec<QueuedJob>) -> Result<(), QueueError> {
        self.sent
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .extend(jobs);
        Ok(())
    }
}
