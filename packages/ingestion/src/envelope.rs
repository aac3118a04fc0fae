//! Versioned job envelope used by every asynchronous hop.
//!
//! Each job is a tagged variant keyed by its wire `type` literal; the
//! payload shape is determined by the tag. Envelopes are immutable once
//! constructed. `parentTraceId` is present on the wire only when the
//! producer supplied it, enabling optional causal chaining across hops.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::search::SearchMetadata;

/// Current envelope schema version.
pub const ENVELOPE_VERSION: u8 = 1;

/// A typed payload that knows its wire `type` literal.
pub trait JobPayload: Serialize + DeserializeOwned {
    /// Queue discriminator, e.g. `"scrape.run"`.
    const TYPE: &'static str;
}

/// Versioned message wrapper carrying a typed payload and trace metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope<P> {
    pub v: u8,
    #[serde(rename = "type")]
    pub job_type: String,
    pub payload: P,
    pub trace_id: String,
    pub created_at: DateTime<Utc>,
    pub source: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_trace_id: Option<String>,
}

impl<P: JobPayload> Envelope<P> {
    /// Wrap a payload with a fresh trace id and the current timestamp.
    pub fn new(payload: P, source: impl Into<String>) -> Self {
        Self {
            v: ENVELOPE_VERSION,
            job_type: P::TYPE.to_string(),
            payload,
            trace_id: Uuid::new_v4().to_string(),
            created_at: Utc::now(),
            source: source.into(),
            parent_trace_id: None,
        }
    }

    /// Wrap a payload, chaining it to the producing job's trace.
    pub fn with_parent(payload: P, source: impl Into<String>, parent_trace_id: impl Into<String>) -> Self {
        let mut envelope = Self::new(payload, source);
        envelope.parent_trace_id = Some(parent_trace_id.into());
        envelope
    }
}

// ============================================================================
// Job payloads
// ============================================================================

/// Run a full scrape of one shelter.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScrapeRunJob {
    pub shelter_id: String,
    pub shelter_slug: String,
    pub base_url: String,
}

impl JobPayload for ScrapeRunJob {
    const TYPE: &'static str = "scrape.run";
}

/// Mirror a dog's source photos into object storage.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessOriginalImagesJob {
    pub dog_id: Uuid,
    pub urls: Vec<String>,
}

impl JobPayload for ProcessOriginalImagesJob {
    const TYPE: &'static str = "images.processOriginal";
}

/// Photo variant to generate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PhotoVariant {
    Professional,
    Nose,
}

/// Generate a stylized photo for a dog.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratePhotosJob {
    pub dog_id: Uuid,
    pub variant: PhotoVariant,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub force: Option<bool>,
}

impl JobPayload for GeneratePhotosJob {
    const TYPE: &'static str = "photos.generate";
}

/// Search index mutation kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReindexOp {
    Upsert,
    Delete,
}

/// Insert/update or remove one dog in the vector search index.
///
/// Upserts carry the synthesized search-document text (`description`) and
/// facet metadata built by the search document builder at enqueue time.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchReindexJob {
    pub op: ReindexOp,
    pub dog_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<SearchMetadata>,
}

impl JobPayload for SearchReindexJob {
    const TYPE: &'static str = "search.reindex";
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_job() -> ScrapeRunJob {
        ScrapeRunJob {
            shelter_id: "promyk".into(),
            shelter_slug: "schronisko-promyk".into(),
            base_url: "https://promyk.example.org".into(),
        }
    }

    #[test]
    fn new_envelope_fills_defaults() {
        let before = Utc::now();
        let envelope = Envelope::new(sample_job(), "cli");
        let after = Utc::now();

        assert_eq!(envelope.v, 1);
        assert_eq!(envelope.job_type, "scrape.run");
        assert!(!envelope.trace_id.is_empty());
        assert!(envelope.created_at >= before && envelope.created_at <= after);
        assert_eq!(envelope.source, "cli");
        assert!(envelope.parent_trace_id.is_none());
    }

    #[test]
    fn trace_ids_are_unique_across_calls() {
        let a = Envelope::new(sample_job(), "cli");
        let b = Envelope::new(sample_job(), "cli");
        assert_ne!(a.trace_id, b.trace_id);
    }

    #[test]
    fn parent_trace_id_key_is_absent_unless_supplied() {
        let envelope = Envelope::new(sample_job(), "scheduler");
        let json = serde_json::to_value(&envelope).unwrap();
        assert!(!json.as_object().unwrap().contains_key("parentTraceId"));

        let chained = Envelope::with_parent(sample_job(), "scheduler", "trace-123");
        let json = serde_json::to_value(&chained).unwrap();
        assert_eq!(json["parentTraceId"], "trace-123");
    }

    #[test]
    fn payload_uses_camel_case_wire_keys() {
        let envelope = Envelope::new(sample_job(), "scheduler");
        let json = serde_json::to_value(&envelope).unwrap();
        let payload = json["payload"].as_object().unwrap();

        assert!(payload.contains_key("shelterId"));
        assert!(payload.contains_key("shelterSlug"));
        assert!(payload.contains_key("baseUrl"));
    }

    #[test]
    fn reindex_job_omits_empty_optionals() {
        let job = SearchReindexJob {
            op: ReindexOp::Delete,
            dog_id: Uuid::new_v4(),
            description: None,
            metadata: None,
        };
        let json = serde_json::to_value(&job).unwrap();
        let obj = json.as_object().unwrap();

        assert_eq!(json["op"], "delete");
        assert!(!obj.contains_key("description"));
        assert!(!obj.contains_key("metadata"));
    }

    #[test]
    fn envelope_round_trips_through_json() {
        let envelope = Envelope::with_parent(sample_job(), "scheduler", "parent-1");
        let text = serde_json::to_string(&envelope).unwrap();
        let back: Envelope<ScrapeRunJob> = serde_json::from_str(&text).unwrap();

        assert_eq!(back.trace_id, envelope.trace_id);
        assert_eq!(back.parent_trace_id.as_deref(), Some("parent-1"));
        assert_eq!(back.payload.shelter_id, "promyk");
    }
}
