//! Storage traits and backends.
//!
//! The relational store is an external collaborator; the pipeline only
//! depends on these traits. `MemoryStore` backs tests and local CLI runs,
//! `PostgresStore` (feature `postgres`) backs deployments.

pub mod memory;

#[cfg(feature = "postgres")]
pub mod postgres;

pub use memory::MemoryStore;

#[cfg(feature = "postgres")]
pub use postgres::PostgresStore;

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::{ApiCostInsertError, StorageError};
use crate::model::{ApiCostEntry, Dog, Shelter, ShelterStatus, SyncLog};

/// Shelter lookups and per-run status mutation.
#[async_trait]
pub trait ShelterStore: Send + Sync {
    async fn list_shelters(&self) -> Result<Vec<Shelter>, StorageError>;

    async fn get_shelter(&self, id: &str) -> Result<Option<Shelter>, StorageError>;

    /// Insert or replace a shelter record (used when seeding from the
    /// adapter registry).
    async fn upsert_shelter(&self, shelter: &Shelter) -> Result<(), StorageError>;

    /// Record the outcome of a scrape run.
    async fn update_shelter_sync(
        &self,
        id: &str,
        status: ShelterStatus,
        last_sync: Option<DateTime<Utc>>,
    ) -> Result<(), StorageError>;
}

/// Canonical dog persistence.
#[async_trait]
pub trait DogStore: Send + Sync {
    /// `external_id → fingerprint` for every non-removed dog of a shelter.
    /// This is the stored side of the diff.
    async fn fingerprints_by_shelter(
        &self,
        shelter_id: &str,
    ) -> Result<HashMap<String, String>, StorageError>;

    /// Find a dog by source identity, including soft-removed records.
    async fn find_dog(
        &self,
        shelter_id: &str,
        external_id: &str,
    ) -> Result<Option<Dog>, StorageError>;

    /// All non-removed dogs of a shelter.
    async fn dogs_by_shelter(&self, shelter_id: &str) -> Result<Vec<Dog>, StorageError>;

    async fn insert_dog(&self, dog: &Dog) -> Result<(), StorageError>;

    async fn update_dog(&self, dog: &Dog) -> Result<(), StorageError>;

    /// Soft-delete: set `status = removed`. Returns the dog id when a row
    /// was affected, for the reindex delete job.
    async fn mark_removed(
        &self,
        shelter_id: &str,
        external_id: &str,
    ) -> Result<Option<Uuid>, StorageError>;
}

/// Append-only sync run log.
#[async_trait]
pub trait SyncLogStore: Send + Sync {
    /// Create the log row at run start.
    async fn insert_sync_log(&self, log: &SyncLog) -> Result<(), StorageError>;

    /// Finalize counts and errors at run end.
    async fn update_sync_log(&self, log: &SyncLog) -> Result<(), StorageError>;
}

/// Append-only API cost ledger.
#[async_trait]
pub trait CostStore: Send + Sync {
    async fn insert_cost(&self, entry: &ApiCostEntry) -> Result<(), ApiCostInsertError>;
}
