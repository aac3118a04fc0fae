//! In-memory store for tests and local runs.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::{CostStore, DogStore, ShelterStore, SyncLogStore};
use crate::error::{ApiCostInsertError, StorageError};
use crate::model::{ApiCostEntry, Dog, DogStatus, Shelter, ShelterStatus, SyncLog};

#[derive(Default)]
struct Inner {
    shelters: HashMap<String, Shelter>,
    /// Keyed by (shelter_id, external_id)
    dogs: HashMap<(String, String), Dog>,
    sync_logs: HashMap<Uuid, SyncLog>,
    costs: Vec<ApiCostEntry>,
}

/// Thread-safe in-memory implementation of every store trait.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed with shelter records (builder style, for tests and CLI runs).
    pub fn with_shelters(self, shelters: impl IntoIterator<Item = Shelter>) -> Self {
        {
            let mut inner = self.inner.write().unwrap_or_else(|e| e.into_inner());
            for shelter in shelters {
                inner.shelters.insert(shelter.id.clone(), shelter);
            }
        }
        self
    }

    /// Snapshot of every stored dog (test assertions).
    pub fn all_dogs(&self) -> Vec<Dog> {
        let inner = self.inner.read().unwrap_or_else(|e| e.into_inner());
        inner.dogs.values().cloned().collect()
    }

    /// Snapshot of every sync log (test assertions).
    pub fn all_sync_logs(&self) -> Vec<SyncLog> {
        let inner = self.inner.read().unwrap_or_else(|e| e.into_inner());
        inner.sync_logs.values().cloned().collect()
    }

    /// Snapshot of the cost ledger (test assertions).
    pub fn all_costs(&self) -> Vec<ApiCostEntry> {
        let inner = self.inner.read().unwrap_or_else(|e| e.into_inner());
        inner.costs.clone()
    }
}

#[async_trait]
impl ShelterStore for MemoryStore {
    async fn list_shelters(&self) -> Result<Vec<Shelter>, StorageError> {
        let inner = self.inner.read().unwrap_or_else(|e| e.into_inner());
        let mut shelters: Vec<Shelter> = inner.shelters.values().cloned().collect();
        shelters.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(shelters)
    }

    async fn get_shelter(&self, id: &str) -> Result<Option<Shelter>, StorageError> {
        let inner = self.inner.read().unwrap_or_else(|e| e.into_inner());
        Ok(inner.shelters.get(id).cloned())
    }

    async fn upsert_shelter(&self, shelter: &Shelter) -> Result<(), StorageError> {
        let mut inner = self.inner.write().unwrap_or_else(|e| e.into_inner());
        inner.shelters.insert(shelter.id.clone(), shelter.clone());
        Ok(())
    }

    async fn update_shelter_sync(
        &self,
        id: &str,
        status: ShelterStatus,
        last_sync: Option<DateTime<Utc>>,
    ) -> Result<(), StorageError> {
        let mut inner = self.inner.write().unwrap_or_else(|e| e.into_inner());
        let shelter = inner
            .shelters
            .get_mut(id)
            .ok_or_else(|| StorageError::write(format!("unknown shelter: {}", id)))?;
        shelter.status = status;
        if last_sync.is_some() {
            shelter.last_sync = last_sync;
        }
        Ok(())
    }
}

#[async_trait]
impl DogStore for MemoryStore {
    async fn fingerprints_by_shelter(
        &self,
        shelter_id: &str,
    ) -> Result<HashMap<String, String>, StorageError> {
        let inner = self.inner.read().unwrap_or_else(|e| e.into_inner());
        Ok(inner
            .dogs
            .values()
            .filter(|d| d.shelter_id == shelter_id && d.status != DogStatus::Removed)
            .map(|d| (d.external_id.clone(), d.fingerprint.clone()))
            .collect())
    }

    async fn find_dog(
        &self,
        shelter_id: &str,
        external_id: &str,
    ) -> Result<Option<Dog>, StorageError> {
        let inner = self.inner.read().unwrap_or_else(|e| e.into_inner());
        Ok(inner
            .dogs
            .get(&(shelter_id.to_string(), external_id.to_string()))
            .cloned())
    }

    async fn dogs_by_shelter(&self, shelter_id: &str) -> Result<Vec<Dog>, StorageError> {
        let inner = self.inner.read().unwrap_or_else(|e| e.into_inner());
        let mut dogs: Vec<Dog> = inner
            .dogs
            .values()
            .filter(|d| d.shelter_id == shelter_id && d.status != DogStatus::Removed)
            .cloned()
            .collect();
        dogs.sort_by(|a, b| a.external_id.cmp(&b.external_id));
        Ok(dogs)
    }

    async fn insert_dog(&self, dog: &Dog) -> Result<(), StorageError> {
        let mut inner = self.inner.write().unwrap_or_else(|e| e.into_inner());
        let key = (dog.shelter_id.clone(), dog.external_id.clone());
        if inner.dogs.contains_key(&key) {
            return Err(StorageError::write(format!(
                "dog already exists: {}:{}",
                dog.shelter_id, dog.external_id
            )));
        }
        inner.dogs.insert(key, dog.clone());
        Ok(())
    }

    async fn update_dog(&self, dog: &Dog) -> Result<(), StorageError> {
        let mut inner = self.inner.write().unwrap_or_else(|e| e.into_inner());
        let key = (dog.shelter_id.clone(), dog.external_id.clone());
        if !inner.dogs.contains_key(&key) {
            return Err(StorageError::write(format!(
                "dog does not exist: {}:{}",
                dog.shelter_id, dog.external_id
            )));
        }
        inner.dogs.insert(key, dog.clone());
        Ok(())
    }

    async fn mark_removed(
        &self,
        shelter_id: &str,
        external_id: &str,
    ) -> Result<Option<Uuid>, StorageError> {
        let mut inner = self.inner.write().unwrap_or_else(|e| e.into_inner());
        let key = (shelter_id.to_string(), external_id.to_string());
        match inner.dogs.get_mut(&key) {
            Some(dog) => {
                dog.status = DogStatus::Removed;
                dog.updated_at = Utc::now();
                Ok(Some(dog.id))
            }
            None => Ok(None),
        }
    }
}

#[async_trait]
impl SyncLogStore for MemoryStore {
    async fn insert_sync_log(&self, log: &SyncLog) -> Result<(), StorageError> {
        let mut inner = self.inner.write().unwrap_or_else(|e| e.into_inner());
        inner.sync_logs.insert(log.id, log.clone());
        Ok(())
    }

    async fn update_sync_log(&self, log: &SyncLog) -> Result<(), StorageError> {
        let mut inner = self.inner.write().unwrap_or_else(|e| e.into_inner());
        if !inner.sync_logs.contains_key(&log.id) {
            return Err(StorageError::write(format!("unknown sync log: {}", log.id)));
        }
        inner.sync_logs.insert(log.id, log.clone());
        Ok(())
    }
}

#[async_trait]
impl CostStore for MemoryStore {
    async fn insert_cost(&self, entry: &ApiCostEntry) -> Result<(), ApiCostInsertError> {
        let mut inner = self.inner.write().unwrap_or_else(|e| e.into_inner());
        inner.costs.push(entry.clone());
        Ok(())
    }
}
