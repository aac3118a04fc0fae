//! Embedding / reindex worker.
//!
//! Consumes batches of `search.reindex` jobs. Deletes and upserts have
//! independent acknowledgment boundaries: deletes are acked as soon as the
//! batched delete succeeds, and a later embedding or upsert failure marks
//! only the upsert sub-batch for redelivery.

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use crate::ai::LanguageModel;
use crate::costs::{self, CostTracker};
use crate::envelope::{Envelope, ReindexOp, SearchReindexJob};
use crate::error::VectorizeError;
use crate::queue::{BatchDisposition, IncomingMessage};
use crate::search::SearchMetadata;
use crate::vector::{VectorIndex, VectorRecord};

/// Bounded exponential backoff for the batched vector delete.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            base_delay: Duration::from_millis(100),
        }
    }
}

/// Batch consumer that keeps the vector index synchronized.
pub struct ReindexWorker {
    vector: Arc<dyn VectorIndex>,
    llm: Arc<dyn LanguageModel>,
    embedding_model: String,
    costs: Option<Arc<dyn CostTracker>>,
    retry: RetryPolicy,
}

impl ReindexWorker {
    pub fn new(
        vector: Arc<dyn VectorIndex>,
        llm: Arc<dyn LanguageModel>,
        embedding_model: impl Into<String>,
    ) -> Self {
        Self {
            vector,
            llm,
            embedding_model: embedding_model.into(),
            costs: None,
            retry: RetryPolicy::default(),
        }
    }

    /// Attach the optional cost tracker.
    pub fn with_cost_tracker(mut self, costs: Arc<dyn CostTracker>) -> Self {
        self.costs = Some(costs);
        self
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Process one consumed batch and report per-message ack/retry.
    pub async fn handle_batch(&self, messages: &[IncomingMessage]) -> BatchDisposition {
        let mut disposition = BatchDisposition::default();
        let mut deletes: Vec<(String, String)> = Vec::new();
        let mut upserts: Vec<(String, SearchReindexJob)> = Vec::new();

        for message in messages {
            let envelope: Envelope<SearchReindexJob> =
                match serde_json::from_value(message.body.clone()) {
                    Ok(envelope) => envelope,
                    Err(e) => {
                        // Malformed body: redelivery cannot fix it, ack it away.
                        warn!(message_id = %message.id, error = %e, "dropping malformed reindex message");
                        disposition.ack(&message.id);
                        continue;
                    }
                };

            let job = envelope.payload;
            match job.op {
                ReindexOp::Delete => {
                    deletes.push((message.id.clone(), job.dog_id.to_string()));
                }
                ReindexOp::Upsert => {
                    let eligible = job
                        .description
                        .as_deref()
                        .map(|d| !d.trim().is_empty())
                        .unwrap_or(false);
                    if eligible {
                        upserts.push((message.id.clone(), job));
                    } else {
                        // Nothing to embed; acknowledge and move on.
                        disposition.ack(&message.id);
                    }
                }
            }
        }

        if !deletes.is_empty() {
            let ids: Vec<String> = deletes.iter().map(|(_, dog_id)| dog_id.clone()).collect();
            match self.delete_with_retry(&ids).await {
                Ok(()) => {
                    info!(count = ids.len(), "vector deletes applied");
                    for (message_id, _) in &deletes {
                        disposition.ack(message_id);
                    }
                }
                Err(e) => {
                    warn!(count = ids.len(), error = %e, "vector delete batch failed, marking for redelivery");
                    for (message_id, _) in &deletes {
                        disposition.retry(message_id);
                    }
                }
            }
        }

        if !upserts.is_empty() {
            match self.apply_upserts(&upserts).await {
                Ok(()) => {
                    info!(count = upserts.len(), "vector upserts applied");
                    for (message_id, _) in &upserts {
                        disposition.ack(message_id);
                    }
                }
                Err(e) => {
                    warn!(count = upserts.len(), error = %e, "upsert sub-batch failed, marking for redelivery");
                    for (message_id, _) in &upserts {
                        disposition.retry(message_id);
                    }
                }
            }
        }

        disposition
    }

    /// Batched delete wrapped in the bounded retry policy.
    async fn delete_with_retry(&self, ids: &[String]) -> Result<(), VectorizeError> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.vector.delete(ids).await {
                Ok(()) => return Ok(()),
                Err(e) if attempt >= self.retry.attempts => return Err(e),
                Err(e) => {
                    let delay = self.retry.base_delay * 2u32.pow(attempt - 1);
                    warn!(
                        attempt = attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "vector delete failed, backing off"
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    /// Embed all upsert texts in one call, then issue one batched index
    /// upsert. Any failure fails the whole upsert sub-batch.
    async fn apply_upserts(
        &self,
        upserts: &[(String, SearchReindexJob)],
    ) -> Result<(), VectorizeError> {
        let texts: Vec<String> = upserts
            .iter()
            .map(|(_, job)| job.description.clone().unwrap_or_default())
            .collect();

        let reply = self
            .llm
            .embed_batch(&self.embedding_model, &texts)
            .await
            .map_err(|e| VectorizeError::upsert(format!("embedding failed: {}", e)))?;

        if reply.embeddings.len() != upserts.len() {
            return Err(VectorizeError::upsert(format!(
                "expected {} embeddings, got {}",
                upserts.len(),
                reply.embeddings.len()
            )));
        }

        costs::track(&self.costs, "embed", &self.embedding_model, reply.usage).await;

        let records: Vec<VectorRecord> = upserts
            .iter()
            .zip(reply.embeddings)
            .map(|((_, job), values)| VectorRecord {
                id: job.dog_id.to_string(),
                values,
                metadata: job.metadata.clone().unwrap_or(SearchMetadata {
                    shelter_id: String::new(),
                    city: None,
                    size: None,
                    age_months: None,
                    sex: None,
                }),
            })
            .collect();

        self.vector.upsert(&records).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MockLanguageModel, MockVectorIndex};
    use uuid::Uuid;

    fn message(op: ReindexOp, description: Option<&str>, id: &str) -> IncomingMessage {
        let job = SearchReindexJob {
            op,
            dog_id: Uuid::new_v4(),
            description: description.map(|d| d.to_string()),
            metadata: Some(SearchMetadata {
                shelter_id: "promyk".into(),
                city: None,
                size: None,
                age_months: None,
                sex: None,
            }),
        };
        let envelope = Envelope::new(job, "test");
        IncomingMessage {
            id: id.to_string(),
            body: serde_json::to_value(&envelope).unwrap(),
        }
    }

    fn worker(vector: Arc<MockVectorIndex>) -> ReindexWorker {
        ReindexWorker::new(
            vector,
            Arc::new(MockLanguageModel::new()),
            "text-embedding-3-small",
        )
    }

    #[tokio::test]
    async fn happy_path_acks_everything() {
        let vector = Arc::new(MockVectorIndex::new());
        let worker = worker(Arc::clone(&vector));

        let messages = vec![
            message(ReindexOp::Delete, None, "m1"),
            message(ReindexOp::Upsert, Some("Ma na imię Burek."), "m2"),
            message(ReindexOp::Upsert, Some("Ma na imię Luna."), "m3"),
        ];

        let disposition = worker.handle_batch(&messages).await;

        assert_eq!(disposition.retried.len(), 0);
        assert_eq!(disposition.acked.len(), 3);
        assert_eq!(vector.delete_calls().len(), 1);
        let upserts = vector.upsert_calls();
        assert_eq!(upserts.len(), 1);
        assert_eq!(upserts[0].len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn delete_is_retried_exactly_three_times_before_failing() {
        let vector = Arc::new(MockVectorIndex::new().with_failing_deletes(u32::MAX));
        let worker = worker(Arc::clone(&vector));

        let messages = vec![message(ReindexOp::Delete, None, "m1")];
        let disposition = worker.handle_batch(&messages).await;

        assert_eq!(vector.delete_calls().len(), 3);
        assert_eq!(disposition.retried, vec!["m1".to_string()]);
        assert!(disposition.acked.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn transient_delete_failure_recovers_before_attempts_run_out() {
        let vector = Arc::new(MockVectorIndex::new().with_failing_deletes(2));
        let worker = worker(Arc::clone(&vector));

        let messages = vec![message(ReindexOp::Delete, None, "m1")];
        let disposition = worker.handle_batch(&messages).await;

        assert_eq!(vector.delete_calls().len(), 3);
        assert_eq!(disposition.acked, vec!["m1".to_string()]);
    }

    #[tokio::test]
    async fn upsert_failure_does_not_retry_acked_deletes() {
        let vector = Arc::new(MockVectorIndex::new().with_failing_upserts(1));
        let worker = worker(Arc::clone(&vector));

        let messages = vec![
            message(ReindexOp::Delete, None, "m-delete"),
            message(ReindexOp::Upsert, Some("opis"), "m-upsert"),
        ];
        let disposition = worker.handle_batch(&messages).await;

        assert_eq!(disposition.acked, vec!["m-delete".to_string()]);
        assert_eq!(disposition.retried, vec!["m-upsert".to_string()]);
    }

    #[tokio::test]
    async fn embedding_failure_retries_only_the_upsert_sub_batch() {
        let vector = Arc::new(MockVectorIndex::new());
        let llm = Arc::new(MockLanguageModel::new().with_failing_embeddings());
        let worker = ReindexWorker::new(vector.clone(), llm, "text-embedding-3-small");

        let messages = vec![
            message(ReindexOp::Delete, None, "m-delete"),
            message(ReindexOp::Upsert, Some("opis"), "m-upsert"),
        ];
        let disposition = worker.handle_batch(&messages).await;

        assert_eq!(disposition.acked, vec!["m-delete".to_string()]);
        assert_eq!(disposition.retried, vec!["m-upsert".to_string()]);
        assert!(vector.upsert_calls().is_empty());
    }

    #[tokio::test]
    async fn upsert_without_description_is_acked_not_indexed() {
        let vector = Arc::new(MockVectorIndex::new());
        let worker = worker(Arc::clone(&vector));

        let messages = vec![
            message(ReindexOp::Upsert, None, "m1"),
            message(ReindexOp::Upsert, Some("   "), "m2"),
        ];
        let disposition = worker.handle_batch(&messages).await;

        assert_eq!(disposition.acked.len(), 2);
        assert!(vector.upsert_calls().is_empty());
    }

    #[tokio::test]
    async fn malformed_message_is_acked_away() {
        let vector = Arc::new(MockVectorIndex::new());
        let worker = worker(Arc::clone(&vector));

        let messages = vec![IncomingMessage {
            id: "bad".into(),
            body: serde_json::json!({"not": "an envelope"}),
        }];
        let disposition = worker.handle_batch(&messages).await;

        assert_eq!(disposition.acked, vec!["bad".to_string()]);
        assert!(disposition.retried.is_empty());
    }
}
