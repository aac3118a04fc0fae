//! Multi-source shelter ingestion and search-sync pipeline
//!
//! Aggregates pet-adoption listings from independently formatted shelter
//! sites, normalizes them into canonical records, enriches them with
//! AI-derived attributes and a generated bio, and keeps a vector search
//! index synchronized.
//!
//! # Design
//!
//! - **Adapters, not scrapers**: every site's quirks live behind one
//!   fetch/parse/transform contract ([`adapters::ShelterAdapter`]) over an
//!   injected HTTP capability.
//! - **Fingerprint diffing**: a deterministic digest over the
//!   content-bearing fields ([`fingerprint`]) makes re-ingestion of
//!   unchanged listings a no-op, which is what bounds AI spend.
//! - **Job envelopes**: every asynchronous hop carries a versioned,
//!   trace-chained [`envelope::Envelope`]; the delivery substrate is
//!   at-least-once, so every stage is safe to re-run.
//!
//! # Flow
//!
//! ```text
//! Scheduler ──► scrape.run ──► Processor
//!                               │  adapter fetch→parse→transform
//!                               │  AI extraction (before fingerprinting)
//!                               │  diff against stored fingerprints
//!                               │  persist creates/updates/removals
//!                               └─► search.reindex / images.processOriginal / photos.generate
//!                                       │
//!                                       └─► ReindexWorker: embed batch + index mutations
//! ```

pub mod adapters;
pub mod ai;
pub mod config;
pub mod costs;
pub mod diff;
pub mod envelope;
pub mod error;
pub mod fingerprint;
pub mod http;
pub mod model;
pub mod processor;
pub mod queue;
pub mod scheduler;
pub mod search;
pub mod store;
pub mod testing;
pub mod vector;

pub use adapters::{AdapterInfo, AdapterRegistry, ShelterAdapter, ShelterConfig};
pub use ai::{DescriptionGenerator, Extractor, LanguageModel};
pub use config::Config;
pub use costs::{CostTracker, StoreCostTracker, TokenUsage};
pub use diff::{Candidate, DiffOutcome};
pub use envelope::{
    Envelope, GeneratePhotosJob, JobPayload, PhotoVariant, ProcessOriginalImagesJob,
    ReindexOp, ScrapeRunJob, SearchReindexJob,
};
pub use error::{
    ApiCostInsertError, ExtractionError, GenerationError, NotFoundError, ParseError,
    PipelineError, QueueError, Result, ScrapeError, StorageError, VectorizeError,
};
pub use http::{HttpFetch, ReqwestHttp};
pub use model::{
    ApiCostEntry, BioTone, BreedEstimate, CreateDogInput, Dog, DogStatus, RawDogData, Sex,
    Shelter, ShelterStatus, SizeCategory, SizeEstimate, SyncLog,
};
pub use processor::{ProcessOutcome, ScrapeProcessor};
pub use queue::{BatchDisposition, IncomingMessage, JobQueue, QueuedJob, TracingQueue};
pub use search::{build_document, ReindexWorker, RetryPolicy, SearchDocument, SearchMetadata};
pub use store::{CostStore, DogStore, MemoryStore, ShelterStore, SyncLogStore};
pub use vector::{HttpVectorIndex, VectorIndex, VectorRecord};

#[cfg(feature = "postgres")]
pub use store::PostgresStore;
