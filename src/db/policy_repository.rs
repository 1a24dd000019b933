//! Expiration policy repository
//!
//! Read-only keyed retrieval for the lifecycle manager; creation and
//! deletion exist for administrative tooling and tests. Deleting a policy
//! cascades to its dependent key records.

use chrono::Utc;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::db::parse_db_timestamp;
use crate::models::ExpirationPolicy;
use crate::utils::{AppError, AppResult};

#[derive(Debug, sqlx::FromRow)]
struct PolicyRow {
    id: String,
    name: String,
    type_id: String,
    validate_days: i64,
    created_at: String,
}

pub struct PolicyRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> PolicyRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn get_by_name(&self, name: &str) -> AppResult<Option<ExpirationPolicy>> {
        let row = sqlx::query_as::<_, PolicyRow>(
            "SELECT id, name, type_id, validate_days, created_at FROM policies WHERE name = ?",
        )
        .bind(name)
        .fetch_optional(self.pool)
        .await?;

        row.map(row_to_policy).transpose()
    }

    /// First policy whose remote type identifier matches; used on the
    /// binding path where a miss is tolerated
    pub async fn get_by_type_id(&self, type_id: &str) -> AppResult<Option<ExpirationPolicy>> {
        let row = sqlx::query_as::<_, PolicyRow>(
            r#"
            SELECT id, name, type_id, validate_days, created_at
            FROM policies
            WHERE type_id = ?
            ORDER BY created_at
            LIMIT 1
            "#,
        )
        .bind(type_id)
        .fetch_optional(self.pool)
        .await?;

        row.map(row_to_policy).transpose()
    }

    /// Default policy for system-issued provisioning (oldest configured)
    pub async fn first(&self) -> AppResult<Option<ExpirationPolicy>> {
        let row = sqlx::query_as::<_, PolicyRow>(
            r#"
            SELECT id, name, type_id, validate_days, created_at
            FROM policies
            ORDER BY created_at
            LIMIT 1
            "#,
        )
        .fetch_optional(self.pool)
        .await?;

        row.map(row_to_policy).transpose()
    }

    pub async fn create(
        &self,
        name: &str,
        type_id: &str,
        validate_days: i64,
    ) -> AppResult<ExpirationPolicy> {
        let id = Uuid::new_v4();
        let created_at = Utc::now();

        sqlx::query(
            r#"
            INSERT INTO policies (id, name, type_id, validate_days, created_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(id.to_string())
        .bind(name)
        .bind(type_id)
        .bind(validate_days)
        .bind(created_at.to_rfc3339())
        .execute(self.pool)
        .await?;

        Ok(ExpirationPolicy {
            id,
            name: name.to_string(),
            type_id: type_id.to_string(),
            validate_days,
            created_at,
        })
    }

    /// Delete a policy; dependent key records are removed by the schema's
    /// cascade rule
    pub async fn delete(&self, id: Uuid) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM policies WHERE id = ?")
            .bind(id.to_string())
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

fn row_to_policy(row: PolicyRow) -> AppResult<ExpirationPolicy> {
    Ok(ExpirationPolicy {
        id: Uuid::parse_str(&row.id)
            .map_err(|_| AppError::Database(format!("Invalid policy id: {}", row.id)))?,
        name: row.name,
        type_id: row.type_id,
        validate_days: row.validate_days,
        created_at: parse_db_timestamp(&row.created_at)
            .map_err(|e| AppError::Database(e.to_string()))?,
    })
}
