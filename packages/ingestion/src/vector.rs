//! Vector index capability.
//!
//! The index service itself is an external collaborator; this module holds
//! the mutation interface the reindex worker drives plus a REST-backed
//! production implementation. Deletes are naturally idempotent, which keeps
//! re-delivered delete jobs safe under at-least-once delivery.

use async_trait::async_trait;
use serde::Serialize;

use crate::error::VectorizeError;
use crate::search::SearchMetadata;

/// One record in the vector index.
#[derive(Debug, Clone, Serialize)]
pub struct VectorRecord {
    /// Dog id as the index key
    pub id: String,
    /// Embedding values
    pub values: Vec<f32>,
    /// Facet metadata for filtered search
    pub metadata: SearchMetadata,
}

/// Batched mutation interface to the vector index.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Insert or replace records in one call.
    async fn upsert(&self, records: &[VectorRecord]) -> Result<(), VectorizeError>;

    /// Delete records by id in one call. Deleting an absent id is a no-op.
    async fn delete(&self, ids: &[String]) -> Result<(), VectorizeError>;
}

/// REST-backed vector index client.
pub struct HttpVectorIndex {
    client: reqwest::Client,
    base_url: String,
    api_token: String,
}

impl HttpVectorIndex {
    pub fn new(base_url: impl Into<String>, api_token: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            api_token: api_token.into(),
        }
    }
}

#[derive(Serialize)]
struct DeleteRequest<'a> {
    ids: &'a [String],
}

#[async_trait]
impl VectorIndex for HttpVectorIndex {
    async fn upsert(&self, records: &[VectorRecord]) -> Result<(), VectorizeError> {
        let response = self
            .client
            .post(format!("{}/vectors/upsert", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_token))
            .json(&records)
            .send()
            .await
            .map_err(|e| VectorizeError::upsert(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(VectorizeError::upsert(format!(
                "HTTP {}: {}",
                status, error_text
            )));
        }

        Ok(())
    }

    async fn delete(&self, ids: &[String]) -> Result<(), VectorizeError> {
        let response = self
            .client
            .post(format!("{}/vectors/delete", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_token))
            .json(&DeleteRequest { ids })
            .send()
            .await
            .map_err(|e| VectorizeError::delete(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(VectorizeError::delete(format!(
                "HTTP {}: {}",
                status, error_text
            )));
        }

        Ok(())
    }
}
