//! API key record repository
//!
//! Enforces the two uniqueness invariants at write time: one record per
//! user, one record per key string. The pre-checks produce the friendly
//! errors; the UNIQUE constraints in the schema are what actually hold
//! under a check/insert race (see the `From<sqlx::Error>` mapping).

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::db::parse_db_timestamp;
use crate::models::ApiKeyRecord;
use crate::utils::{AppError, AppResult};

#[derive(Debug, sqlx::FromRow)]
struct ApiKeyRow {
    id: String,
    key: String,
    user_id: String,
    policy_id: Option<String>,
    created_at: String,
    expired_at: Option<String>,
}

pub struct ApiKeyRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> ApiKeyRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn get_by_user(&self, user_id: Uuid) -> AppResult<Option<ApiKeyRecord>> {
        let row = sqlx::query_as::<_, ApiKeyRow>(
            r#"
            SELECT id, key, user_id, policy_id, created_at, expired_at
            FROM api_keys
            WHERE user_id = ?
            "#,
        )
        .bind(user_id.to_string())
        .fetch_optional(self.pool)
        .await?;

        row.map(row_to_record).transpose()
    }

    pub async fn get_by_key(&self, key: &str) -> AppResult<Option<ApiKeyRecord>> {
        let row = sqlx::query_as::<_, ApiKeyRow>(
            r#"
            SELECT id, key, user_id, policy_id, created_at, expired_at
            FROM api_keys
            WHERE key = ?
            "#,
        )
        .bind(key)
        .fetch_optional(self.pool)
        .await?;

        row.map(row_to_record).transpose()
    }

    /// Insert a new record, rejecting duplicate owners and duplicate key
    /// strings before any row is written
    pub async fn create(
        &self,
        user_id: Uuid,
        key: &str,
        policy_id: Option<Uuid>,
        created_at: DateTime<Utc>,
        expired_at: Option<DateTime<Utc>>,
    ) -> AppResult<ApiKeyRecord> {
        if self.get_by_user(user_id).await?.is_some() {
            return Err(AppError::DuplicateOwner);
        }
        if self.get_by_key(key).await?.is_some() {
            return Err(AppError::DuplicateKey);
        }

        let id = Uuid::new_v4();
        sqlx::query(
            r#"
            INSERT INTO api_keys (id, key, user_id, policy_id, created_at, expired_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(id.to_string())
        .bind(key)
        .bind(user_id.to_string())
        .bind(policy_id.map(|p| p.to_string()))
        .bind(created_at.to_rfc3339())
        .bind(expired_at.map(|dt| dt.to_rfc3339()))
        .execute(self.pool)
        .await?;

        Ok(ApiKeyRecord {
            id,
            key: key.to_string(),
            user_id,
            policy_id,
            created_at,
            expired_at,
        })
    }

    /// Delete the caller's record; false when no record existed
    pub async fn delete_by_user(&self, user_id: Uuid) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM api_keys WHERE user_id = ?")
            .bind(user_id.to_string())
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

fn row_to_record(row: ApiKeyRow) -> AppResult<ApiKeyRecord> {
    Ok(ApiKeyRecord {
        id: Uuid::parse_str(&row.id)
            .map_err(|_| AppError::Database(format!("Invalid api key id: {}", row.id)))?,
        key: row.key,
        user_id: Uuid::parse_str(&row.user_id)
            .map_err(|_| AppError::Database(format!("Invalid user id: {}", row.user_id)))?,
        policy_id: row
            .policy_id
            .as_deref()
            .map(Uuid::parse_str)
            .transpose()
            .map_err(|_| AppError::Database("Invalid policy id".to_string()))?,
        created_at: parse_db_timestamp(&row.created_at)
            .map_err(|e| AppError::Database(e.to_string()))?,
        expired_at: row
            .expired_at
            .as_deref()
            .map(parse_db_timestamp)
            .transpose()
            .map_err(|e| AppError::Database(e.to_string()))?,
    })
}
