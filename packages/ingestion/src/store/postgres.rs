//! PostgreSQL-backed store.
//!
//! Schema and migrations live with the surrounding infrastructure; this
//! implementation assumes provisioned tables. Dogs are persisted as a JSONB
//! document alongside the columns the pipeline filters on (shelter id,
//! external id, fingerprint, status), which keeps the hot diff query on
//! plain indexed columns.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};
use uuid::Uuid;

use super::{CostStore, DogStore, ShelterStore, SyncLogStore};
use crate::error::{ApiCostInsertError, StorageError};
use crate::model::{ApiCostEntry, Dog, Shelter, ShelterStatus, SyncLog};

/// PostgreSQL implementation of the store traits.
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn status_str(status: ShelterStatus) -> &'static str {
    match status {
        ShelterStatus::Active => "active",
        ShelterStatus::Inactive => "inactive",
        ShelterStatus::Error => "error",
    }
}

fn shelter_from_json(value: serde_json::Value) -> Result<Shelter, StorageError> {
    serde_json::from_value(value)
        .map_err(|e| StorageError::read(format!("corrupt shelter document: {}", e)))
}

fn dog_from_json(value: serde_json::Value) -> Result<Dog, StorageError> {
    serde_json::from_value(value)
        .map_err(|e| StorageError::read(format!("corrupt dog document: {}", e)))
}

#[async_trait]
impl ShelterStore for PostgresStore {
    async fn list_shelters(&self) -> Result<Vec<Shelter>, StorageError> {
        let rows = sqlx::query("SELECT data FROM shelters ORDER BY id")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StorageError::read(e.to_string()))?;

        rows.into_iter()
            .map(|row| {
                let data: serde_json::Value = row
                    .try_get("data")
                    .map_err(|e| StorageError::read(e.to_string()))?;
                shelter_from_json(data)
            })
            .collect()
    }

    async fn get_shelter(&self, id: &str) -> Result<Option<Shelter>, StorageError> {
        let row = sqlx::query("SELECT data FROM shelters WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StorageError::read(e.to_string()))?;

        match row {
            Some(row) => {
                let data: serde_json::Value = row
                    .try_get("data")
                    .map_err(|e| StorageError::read(e.to_string()))?;
                Ok(Some(shelter_from_json(data)?))
            }
            None => Ok(None),
        }
    }

    async fn upsert_shelter(&self, shelter: &Shelter) -> Result<(), StorageError> {
        let data = serde_json::to_value(shelter)
            .map_err(|e| StorageError::write(e.to_string()))?;

        sqlx::query(
            r#"
            INSERT INTO shelters (id, status, last_sync, data)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (id) DO UPDATE SET
                status = EXCLUDED.status,
                last_sync = EXCLUDED.last_sync,
                data = EXCLUDED.data
            "#,
        )
        .bind(&shelter.id)
        .bind(status_str(shelter.status))
        .bind(shelter.last_sync)
        .bind(data)
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::write(e.to_string()))?;

        Ok(())
    }

    async fn update_shelter_sync(
        &self,
        id: &str,
        status: ShelterStatus,
        last_sync: Option<DateTime<Utc>>,
    ) -> Result<(), StorageError> {
        sqlx::query(
            r#"
            UPDATE shelters
            SET status = $2,
                last_sync = COALESCE($3, last_sync),
                data = jsonb_set(
                    jsonb_set(data, '{status}', to_jsonb($2::text)),
                    '{last_sync}', COALESCE(to_jsonb($3::timestamptz), data->'last_sync')
                )
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(status_str(status))
        .bind(last_sync)
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::write(e.to_string()))?;

        Ok(())
    }
}

#[async_trait]
impl DogStore for PostgresStore {
    async fn fingerprints_by_shelter(
        &self,
        shelter_id: &str,
    ) -> Result<HashMap<String, String>, StorageError> {
        let rows = sqlx::query(
            r#"
            SELECT external_id, fingerprint
            FROM dogs
            WHERE shelter_id = $1 AND status != 'removed'
            "#,
        )
        .bind(shelter_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::read(e.to_string()))?;

        rows.into_iter()
            .map(|row| {
                let external_id: String = row
                    .try_get("external_id")
                    .map_err(|e| StorageError::read(e.to_string()))?;
                let fingerprint: String = row
                    .try_get("fingerprint")
                    .map_err(|e| StorageError::read(e.to_string()))?;
                Ok((external_id, fingerprint))
            })
            .collect()
    }

    async fn find_dog(
        &self,
        shelter_id: &str,
        external_id: &str,
    ) -> Result<Option<Dog>, StorageError> {
        let row = sqlx::query("SELECT data FROM dogs WHERE shelter_id = $1 AND external_id = $2")
            .bind(shelter_id)
            .bind(external_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StorageError::read(e.to_string()))?;

        match row {
            Some(row) => {
                let data: serde_json::Value = row
                    .try_get("data")
                    .map_err(|e| StorageError::read(e.to_string()))?;
                Ok(Some(dog_from_json(data)?))
            }
            None => Ok(None),
        }
    }

    async fn dogs_by_shelter(&self, shelter_id: &str) -> Result<Vec<Dog>, StorageError> {
        let rows = sqlx::query(
            r#"
            SELECT data FROM dogs
            WHERE shelter_id = $1 AND status != 'removed'
            ORDER BY external_id
            "#,
        )
        .bind(shelter_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::read(e.to_string()))?;

        rows.into_iter()
            .map(|row| {
                let data: serde_json::Value = row
                    .try_get("data")
                    .map_err(|e| StorageError::read(e.to_string()))?;
                dog_from_json(data)
            })
            .collect()
    }

    async fn insert_dog(&self, dog: &Dog) -> Result<(), StorageError> {
        let data = serde_json::to_value(dog).map_err(|e| StorageError::write(e.to_string()))?;

        sqlx::query(
            r#"
            INSERT INTO dogs (id, shelter_id, external_id, fingerprint, status, data)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(dog.id)
        .bind(&dog.shelter_id)
        .bind(&dog.external_id)
        .bind(&dog.fingerprint)
        .bind("available")
        .bind(data)
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::write(e.to_string()))?;

        Ok(())
    }

    async fn update_dog(&self, dog: &Dog) -> Result<(), StorageError> {
        let data = serde_json::to_value(dog).map_err(|e| StorageError::write(e.to_string()))?;

        let result = sqlx::query(
            r#"
            UPDATE dogs
            SET fingerprint = $3, status = $4, data = $5
            WHERE shelter_id = $1 AND external_id = $2
            "#,
        )
        .bind(&dog.shelter_id)
        .bind(&dog.external_id)
        .bind(&dog.fingerprint)
        .bind(match dog.status {
            crate::model::DogStatus::Available => "available",
            crate::model::DogStatus::Adopted => "adopted",
            crate::model::DogStatus::Reserved => "reserved",
            crate::model::DogStatus::Removed => "removed",
        })
        .bind(data)
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::write(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(StorageError::write(format!(
                "dog does not exist: {}:{}",
                dog.shelter_id, dog.external_id
            )));
        }

        Ok(())
    }

    async fn mark_removed(
        &self,
        shelter_id: &str,
        external_id: &str,
    ) -> Result<Option<Uuid>, StorageError> {
        let row = sqlx::query(
            r#"
            UPDATE dogs
            SET status = 'removed',
                data = jsonb_set(data, '{status}', '"removed"')
            WHERE shelter_id = $1 AND external_id = $2
            RETURNING id
            "#,
        )
        .bind(shelter_id)
        .bind(external_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StorageError::delete(e.to_string()))?;

        match row {
            Some(row) => {
                let id: Uuid = row
                    .try_get("id")
                    .map_err(|e| StorageError::delete(e.to_string()))?;
                Ok(Some(id))
            }
            None => Ok(None),
        }
    }
}

#[async_trait]
impl SyncLogStore for PostgresStore {
    async fn insert_sync_log(&self, log: &SyncLog) -> Result<(), StorageError> {
        let data = serde_json::to_value(log).map_err(|e| StorageError::write(e.to_string()))?;

        sqlx::query("INSERT INTO sync_logs (id, shelter_id, data) VALUES ($1, $2, $3)")
            .bind(log.id)
            .bind(&log.shelter_id)
            .bind(data)
            .execute(&self.pool)
            .await
            .map_err(|e| StorageError::write(e.to_string()))?;

        Ok(())
    }

    async fn update_sync_log(&self, log: &SyncLog) -> Result<(), StorageError> {
        let data = serde_json::to_value(log).map_err(|e| StorageError::write(e.to_string()))?;

        sqlx::query("UPDATE sync_logs SET data = $2 WHERE id = $1")
            .bind(log.id)
            .bind(data)
            .execute(&self.pool)
            .await
            .map_err(|e| StorageError::write(e.to_string()))?;

        Ok(())
    }
}

#[async_trait]
impl CostStore for PostgresStore {
    async fn insert_cost(&self, entry: &ApiCostEntry) -> Result<(), ApiCostInsertError> {
        sqlx::query(
            r#"
            INSERT INTO api_costs (created_at, operation, model, input_tokens, output_tokens, cost_usd)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(entry.created_at)
        .bind(&entry.operation)
        .bind(&entry.model)
        .bind(entry.input_tokens as i32)
        .bind(entry.output_tokens as i32)
        .bind(entry.cost_usd)
        .execute(&self.pool)
        .await
        .map_err(|e| ApiCostInsertError::new(e.to_string()))?;

        Ok(())
    }
}
