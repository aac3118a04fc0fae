//! Search document synthesis and the embedding/reindex worker.

pub mod document;
pub mod worker;

pub use document::{build_document, year_word, SearchDocument, SearchMetadata};
pub use worker::{ReindexWorker, RetryPolicy};
