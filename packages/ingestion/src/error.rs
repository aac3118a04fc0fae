//! Typed errors for the ingestion pipeline.
//!
//! Uses `thiserror` for library errors (not `anyhow`) so callers can match
//! on failure domains: per-item errors are swallowed by the processor,
//! per-shelter errors abort one run, worker errors drive queue redelivery.

use thiserror::Error;

/// Network or fetch failure while scraping a shelter site.
#[derive(Debug, Error)]
#[error("scrape failed for shelter {shelter_id}: {message}")]
pub struct ScrapeError {
    /// Shelter whose run failed
    pub shelter_id: String,

    /// Human-readable description of the failure
    pub message: String,

    /// Originating cause, when one exists
    #[source]
    pub cause: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl ScrapeError {
    pub fn new(shelter_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            shelter_id: shelter_id.into(),
            message: message.into(),
            cause: None,
        }
    }

    pub fn with_cause(
        shelter_id: impl Into<String>,
        message: impl Into<String>,
        cause: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            shelter_id: shelter_id.into(),
            message: message.into(),
            cause: Some(Box::new(cause)),
        }
    }
}

/// Structural failure of source content (listing or detail page).
#[derive(Debug, Error)]
#[error("parse error: {message}")]
pub struct ParseError {
    pub message: String,
}

impl ParseError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Which input modality an extraction call was operating on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionSource {
    Text,
    Photo,
}

impl std::fmt::Display for ExtractionSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExtractionSource::Text => write!(f, "text"),
            ExtractionSource::Photo => write!(f, "photo"),
        }
    }
}

/// LLM call or schema-validation failure during attribute extraction.
#[derive(Debug, Error)]
#[error("{source_kind} extraction failed: {message}")]
pub struct ExtractionError {
    /// Whether text or photo extraction failed
    pub source_kind: ExtractionSource,

    pub message: String,

    #[source]
    pub cause: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl ExtractionError {
    pub fn new(source_kind: ExtractionSource, message: impl Into<String>) -> Self {
        Self {
            source_kind,
            message: message.into(),
            cause: None,
        }
    }

    pub fn with_cause(
        source_kind: ExtractionSource,
        message: impl Into<String>,
        cause: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            source_kind,
            message: message.into(),
            cause: Some(Box::new(cause)),
        }
    }
}

/// Bio generation failure.
#[derive(Debug, Error)]
#[error("bio generation failed: {message}")]
pub struct GenerationError {
    pub message: String,

    #[source]
    pub cause: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl GenerationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            cause: None,
        }
    }

    pub fn with_cause(
        message: impl Into<String>,
        cause: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            message: message.into(),
            cause: Some(Box::new(cause)),
        }
    }
}

/// Storage operation that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageOp {
    Read,
    Write,
    Delete,
}

impl std::fmt::Display for StorageOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageOp::Read => write!(f, "read"),
            StorageOp::Write => write!(f, "write"),
            StorageOp::Delete => write!(f, "delete"),
        }
    }
}

/// Relational store failure.
#[derive(Debug, Error)]
#[error("storage {operation} failed: {message}")]
pub struct StorageError {
    pub operation: StorageOp,
    pub message: String,
}

impl StorageError {
    pub fn read(message: impl Into<String>) -> Self {
        Self {
            operation: StorageOp::Read,
            message: message.into(),
        }
    }

    pub fn write(message: impl Into<String>) -> Self {
        Self {
            operation: StorageOp::Write,
            message: message.into(),
        }
    }

    pub fn delete(message: impl Into<String>) -> Self {
        Self {
            operation: StorageOp::Delete,
            message: message.into(),
        }
    }
}

/// A referenced entity does not exist.
#[derive(Debug, Error)]
#[error("{entity} not found: {id}")]
pub struct NotFoundError {
    pub entity: &'static str,
    pub id: String,
}

impl NotFoundError {
    pub fn new(entity: &'static str, id: impl Into<String>) -> Self {
        Self {
            entity,
            id: id.into(),
        }
    }
}

/// Vector index mutation that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VectorizeOp {
    Upsert,
    Delete,
}

impl std::fmt::Display for VectorizeOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VectorizeOp::Upsert => write!(f, "upsert"),
            VectorizeOp::Delete => write!(f, "delete"),
        }
    }
}

/// Vector index failure.
#[derive(Debug, Error)]
#[error("vectorize {operation} failed: {message}")]
pub struct VectorizeError {
    pub operation: VectorizeOp,
    pub message: String,
}

impl VectorizeError {
    pub fn upsert(message: impl Into<String>) -> Self {
        Self {
            operation: VectorizeOp::Upsert,
            message: message.into(),
        }
    }

    pub fn delete(message: impl Into<String>) -> Self {
        Self {
            operation: VectorizeOp::Delete,
            message: message.into(),
        }
    }
}

/// Cost ledger insert failure. Always non-fatal: logged, never propagated
/// into the primary pipeline.
#[derive(Debug, Error)]
#[error("api cost insert failed: {message}")]
pub struct ApiCostInsertError {
    pub message: String,
}

impl ApiCostInsertError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Queue send failure.
#[derive(Debug, Error)]
#[error("queue send failed: {message}")]
pub struct QueueError {
    pub message: String,
}

impl QueueError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Top-level pipeline error composing the domain error kinds.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Scrape(#[from] ScrapeError),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    #[error(transparent)]
    Generation(#[from] GenerationError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    NotFound(#[from] NotFoundError),

    #[error(transparent)]
    Vectorize(#[from] VectorizeError),

    #[error(transparent)]
    Queue(#[from] QueueError),

    #[error("config error: {0}")]
    Config(String),

    #[error("scheduler error: {0}")]
    Scheduler(String),
}

/// Result type alias for pipeline operations.
pub type Result<T, E = PipelineError> = std::result::Result<T, E>;
