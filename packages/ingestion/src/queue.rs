//! Job queue capability.
//!
//! The message-delivery substrate is external and guarantees at-least-once
//! delivery with per-message acknowledge/retry. Producers see a `JobQueue`;
//! consumers receive message batches and report a [`BatchDisposition`]
//! telling the substrate which messages to ack and which to hand back.

use async_trait::async_trait;
use serde::Serialize;
use tracing::info;

use crate::envelope::{Envelope, JobPayload};
use crate::error::QueueError;

/// A serialized envelope ready for the queue.
#[derive(Debug, Clone)]
pub struct QueuedJob {
    /// Wire `type` discriminator
    pub job_type: String,
    /// The full envelope as JSON
    pub body: serde_json::Value,
}

impl QueuedJob {
    /// Serialize an envelope for sending.
    pub fn from_envelope<P: JobPayload + Serialize>(
        envelope: &Envelope<P>,
    ) -> Result<Self, QueueError> {
        let body = serde_json::to_value(envelope)
            .map_err(|e| QueueError::new(format!("failed to serialize envelope: {}", e)))?;
        Ok(Self {
            job_type: envelope.job_type.clone(),
            body,
        })
    }
}

/// Producer-side queue capability.
#[async_trait]
pub trait JobQueue: Send + Sync {
    /// Enqueue a single job.
    async fn send(&self, job: QueuedJob) -> Result<(), QueueError>;

    /// Enqueue a batch of jobs in one send.
    async fn send_batch(&self, jobs: Vec<QueuedJob>) -> Result<(), QueueError> {
        for job in jobs {
            self.send(job).await?;
        }
        Ok(())
    }
}

/// One delivered message on the consumer side.
#[derive(Debug, Clone)]
pub struct IncomingMessage {
    /// Substrate-assigned delivery id, used for ack/retry
    pub id: String,
    /// The envelope as JSON
    pub body: serde_json::Value,
}

/// Consumer verdict for a processed batch: which delivery ids to
/// acknowledge and which to mark for redelivery.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchDisposition {
    pub acked: Vec<String>,
    pub retried: Vec<String>,
}

impl BatchDisposition {
    pub fn ack(&mut self, id: impl Into<String>) {
        self.acked.push(id.into());
    }

    pub fn retry(&mut self, id: impl Into<String>) {
        self.retried.push(id.into());
    }
}

/// A `JobQueue` that only logs sends.
///
/// Stands in when no delivery substrate is wired up (local CLI runs); the
/// real queue lives in the surrounding infrastructure.
#[derive(Debug, Default)]
pub struct TracingQueue;

#[async_trait]
impl JobQueue for TracingQueue {
    async fn send(&self, job: QueuedJob) -> Result<(), QueueError> {
        info!(job_type = %job.job_type, "enqueue job");
        Ok(())
    }

    async fn send_batch(&self, jobs: Vec<QueuedJob>) -> Result<(), QueueError> {
        info!(count = jobs.len(), "enqueue job batch");
        for job in &jobs {
            info!(job_type = %job.job_type, "enqueue job");
        }
        Ok(())
    }
}
