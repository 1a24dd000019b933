//! Banner notification repository

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::db::parse_db_timestamp;
use crate::models::Notification;
use crate::utils::{AppError, AppResult};

#[derive(Debug, sqlx::FromRow)]
struct NotificationRow {
    id: String,
    title: String,
    message: String,
    is_active: i64,
    start_date: String,
    end_date: Option<String>,
    created_at: String,
}

pub struct NotificationRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> NotificationRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Active notifications whose window contains `now`, newest start first.
    /// Both window boundaries are inclusive.
    pub async fn active_at(&self, now: DateTime<Utc>) -> AppResult<Vec<Notification>> {
        let now = now.to_rfc3339();
        let rows = sqlx::query_as::<_, NotificationRow>(
            r#"
            SELECT id, title, message, is_active, start_date, end_date, created_at
            FROM notifications
            WHERE is_active = 1
              AND datetime(start_date) <= datetime(?)
              AND (end_date IS NULL OR datetime(end_date) >= datetime(?))
            ORDER BY datetime(start_date) DESC
            "#,
        )
        .bind(&now)
        .bind(&now)
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(row_to_notification).collect()
    }

    pub async fn create(
        &self,
        title: &str,
        message: &str,
        is_active: bool,
        start_date: DateTime<Utc>,
        end_date: Option<DateTime<Utc>>,
    ) -> AppResult<Notification> {
        let id = Uuid::new_v4();
        let created_at = Utc::now();

        sqlx::query(
            r#"
            INSERT INTO notifications (id, title, message, is_active, start_date, end_date, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(id.to_string())
        .bind(title)
        .bind(message)
        .bind(is_active as i64)
        .bind(start_date.to_rfc3339())
        .bind(end_date.map(|dt| dt.to_rfc3339()))
        .bind(created_at.to_rfc3339())
        .execute(self.pool)
        .await?;

        Ok(Notification {
            id,
            title: title.to_string(),
            message: message.to_string(),
            is_active,
            start_date,
            end_date,
            created_at,
        })
    }
}

fn row_to_notification(row: NotificationRow) -> AppResult<Notification> {
    Ok(Notification {
        id: Uuid::parse_str(&row.id)
            .map_err(|_| AppError::Database(format!("Invalid notification id: {}", row.id)))?,
        title: row.title,
        message: row.message,
        is_active: row.is_active != 0,
        start_date: parse_db_timestamp(&row.start_date)
            .map_err(|e| AppError::Database(e.to_string()))?,
        end_date: row
            .end_date
            .as_deref()
            .map(parse_db_timestamp)
            .transpose()
            .map_err(|e| AppError::Database(e.to_string()))?,
        created_at: parse_db_timestamp(&row.created_at)
            .map_err(|e| AppError::Database(e.to_string()))?,
    })
}
