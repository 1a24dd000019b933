//! User account repository

use chrono::Utc;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::db::parse_db_timestamp;
use crate::models::User;
use crate::utils::{AppError, AppResult};

#[derive(Debug, sqlx::FromRow)]
struct UserRow {
    id: String,
    username: String,
    email: String,
    password_hash: String,
    created_at: String,
}

pub struct UserRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> UserRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn get_by_username(&self, username: &str) -> AppResult<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(
            "SELECT id, username, email, password_hash, created_at FROM users WHERE username = ?",
        )
        .bind(username)
        .fetch_optional(self.pool)
        .await?;

        row.map(row_to_user).transpose()
    }

    pub async fn get_by_id(&self, id: Uuid) -> AppResult<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(
            "SELECT id, username, email, password_hash, created_at FROM users WHERE id = ?",
        )
        .bind(id.to_string())
        .fetch_optional(self.pool)
        .await?;

        row.map(row_to_user).transpose()
    }

    pub async fn create(
        &self,
        username: &str,
        email: &str,
        password_hash: &str,
    ) -> AppResult<User> {
        let id = Uuid::new_v4();
        let created_at = Utc::now();

        sqlx::query(
            r#"
            INSERT INTO users (id, username, email, password_hash, created_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(id.to_string())
        .bind(username)
        .bind(email)
        .bind(password_hash)
        .bind(created_at.to_rfc3339())
        .execute(self.pool)
        .await?;

        Ok(User {
            id,
            username: username.to_string(),
            email: email.to_string(),
            password_hash: password_hash.to_string(),
            created_at,
        })
    }
}

fn row_to_user(row: UserRow) -> AppResult<User> {
    Ok(User {
        id: Uuid::parse_str(&row.id)
            .map_err(|_| AppError::Database(format!("Invalid user id: {}", row.id)))?,
        username: row.username,
        email: row.email,
        password_hash: row.password_hash,
        created_at: parse_db_timestamp(&row.created_at)
            .map_err(|e| AppError::Database(e.to_string()))?,
    })
}
