use async_trait::async_trait;
use chrono::Utc;
use portal_core::model::ProgressState;
use sqlx::Row;

use crate::envelope::{decode_state, encode_state};
use crate::repository::{ProgressRepository, StorageError};

use super::SqliteRepository;

#[async_trait]
impl ProgressRepository for SqliteRepository {
    async fn load(&self) -> Result<Option<ProgressState>, StorageError> {
        let row = sqlx::query("SELECT value FROM kv_entries WHERE key = ?1")
            .bind(&self.progress_key)
            .fetch_optional(&self.pool)
            .await
            .map_err(|err| StorageError::Connection(err.to_string()))?;

        let Some(row) = row else {
            return Ok(None);
        };

        let raw: String = row
            .try_get("value")
            .map_err(|err| StorageError::Serialization(err.to_string()))?;
        decode_state(&raw).map(Some)
    }

    async fn save(&self, state: &ProgressState) -> Result<(), StorageError> {
        let raw = encode_state(state)?;
        sqlx::query(
            r"
            INSERT INTO kv_entries (key, value, updated_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at
            ",
        )
        .bind(&self.progress_key)
        .bind(raw)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(|err| StorageError::Connection(err.to_string()))?;

        Ok(())
    }
}
