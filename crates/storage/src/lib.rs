//! Namespaced key/value persistence for record attribute sets.
//!
//! Each entry is the full attribute bag of one record, keyed by its
//! identifier, under one namespace per record type so the applications never
//! collide. Every mutation completes against SQLite before the call returns,
//! so a crash immediately after a call leaves the store consistent with the
//! last completed call.

use std::str::FromStr;

use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    Pool, Row, Sqlite,
};
use thiserror::Error;
use tracing::warn;

use shared::domain::{Attributes, RecordId};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("record {id} already exists in namespace '{namespace}'")]
    DuplicateRecord { namespace: String, id: RecordId },
    #[error("record {id} does not exist in namespace '{namespace}'")]
    UnknownRecord { namespace: String, id: RecordId },
    #[error("failed to encode attributes for record {id}: {source}")]
    Encode {
        id: RecordId,
        source: serde_json::Error,
    },
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

#[derive(Debug, Clone)]
pub struct PersistedRecord {
    pub id: RecordId,
    pub attributes: Attributes,
}

#[derive(Clone)]
pub struct RecordStore {
    pool: Pool<Sqlite>,
}

impl RecordStore {
    pub async fn open(database_url: &str) -> Result<Self, StoreError> {
        let connect_options =
            SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
        // A single connection keeps writes strictly ordered and lets
        // `sqlite::memory:` behave as one database in tests.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(connect_options)
            .await?;
        let store = Self { pool };
        store.ensure_schema().await?;
        Ok(store)
    }

    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }

    async fn ensure_schema(&self) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS records (
                namespace  TEXT NOT NULL,
                id         TEXT NOT NULL,
                attributes TEXT NOT NULL,
                created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
                PRIMARY KEY (namespace, id)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Loads every record persisted under `namespace`, in original creation
    /// order. A missing namespace yields an empty list; a row whose stored
    /// attributes no longer parse is skipped with a warning, never an error.
    pub async fn load_all(&self, namespace: &str) -> Result<Vec<PersistedRecord>, StoreError> {
        let rows = sqlx::query(
            "SELECT id, attributes FROM records WHERE namespace = ? ORDER BY rowid ASC",
        )
        .bind(namespace)
        .fetch_all(&self.pool)
        .await?;

        let mut records = Vec::with_capacity(rows.len());
        for row in rows {
            let raw_id = row.get::<String, _>(0);
            let Ok(id) = raw_id.parse::<RecordId>() else {
                warn!(namespace, id = %raw_id, "skipping record with malformed identifier");
                continue;
            };
            let body = row.get::<String, _>(1);
            match serde_json::from_str::<serde_json::Value>(&body) {
                Ok(serde_json::Value::Object(attributes)) => {
                    records.push(PersistedRecord { id, attributes });
                }
                _ => {
                    warn!(namespace, %id, "skipping record with corrupt attributes");
                }
            }
        }
        Ok(records)
    }

    pub async fn create(
        &self,
        namespace: &str,
        id: RecordId,
        attributes: &Attributes,
    ) -> Result<(), StoreError> {
        let body = encode(id, attributes)?;
        let result = sqlx::query("INSERT INTO records (namespace, id, attributes) VALUES (?, ?, ?)")
            .bind(namespace)
            .bind(id.to_string())
            .bind(body)
            .execute(&self.pool)
            .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                Err(StoreError::DuplicateRecord {
                    namespace: namespace.to_string(),
                    id,
                })
            }
            Err(error) => Err(error.into()),
        }
    }

    /// Overwrites the entry for an existing record. Updating an identifier
    /// that was never created is a logic error and is surfaced as
    /// [`StoreError::UnknownRecord`] rather than silently ignored.
    pub async fn update(
        &self,
        namespace: &str,
        id: RecordId,
        attributes: &Attributes,
    ) -> Result<(), StoreError> {
        let body = encode(id, attributes)?;
        let updated = sqlx::query(
            "UPDATE records SET attributes = ?, updated_at = CURRENT_TIMESTAMP
             WHERE namespace = ? AND id = ?",
        )
        .bind(body)
        .bind(namespace)
        .bind(id.to_string())
        .execute(&self.pool)
        .await?
        .rows_affected();

        if updated == 0 {
            return Err(StoreError::UnknownRecord {
                namespace: namespace.to_string(),
                id,
            });
        }
        Ok(())
    }

    /// Removes the entry for `id`. Idempotent: destroying a record twice is
    /// not an error. Returns whether an entry existed.
    pub async fn destroy(&self, namespace: &str, id: RecordId) -> Result<bool, StoreError> {
        let removed = sqlx::query("DELETE FROM records WHERE namespace = ? AND id = ?")
            .bind(namespace)
            .bind(id.to_string())
            .execute(&self.pool)
            .await?
            .rows_affected();
        Ok(removed > 0)
    }

    /// Deletes every record under `namespace`. Used by the session board,
    /// which treats persisted sessions as transient data on startup.
    pub async fn clear_namespace(&self, namespace: &str) -> Result<u64, StoreError> {
        let removed = sqlx::query("DELETE FROM records WHERE namespace = ?")
            .bind(namespace)
            .execute(&self.pool)
            .await?
            .rows_affected();
        Ok(removed)
    }
}

fn encode(id: RecordId, attributes: &Attributes) -> Result<String, StoreError> {
    serde_json::to_string(attributes).map_err(|source| StoreError::Encode { id, source })
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
