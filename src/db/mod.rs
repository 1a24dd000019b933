//! Database layer
//!
//! SQLite-backed persistence for key records, expiration policies, content
//! pages, banner notifications and user accounts. Timestamps are stored as
//! RFC3339 text.

pub mod api_key_repository;
pub mod notification_repository;
pub mod page_repository;
pub mod policy_repository;
pub mod user_repository;

pub use api_key_repository::ApiKeyRepository;
pub use notification_repository::NotificationRepository;
pub use page_repository::PageRepository;
pub use policy_repository::PolicyRepository;
pub use user_repository::UserRepository;

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDateTime, Utc};
use sqlx::{Pool, Sqlite};

use crate::config::DatabaseConfig;

/// Database connection pool type
pub type DbPool = Pool<Sqlite>;

/// Initialize the database connection pool and run migrations
pub async fn init_pool(config: &DatabaseConfig) -> Result<DbPool> {
    let pool = sqlx::sqlite::SqlitePoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(std::time::Duration::from_secs(config.connect_timeout_secs))
        .connect(&config.url)
        .await
        .context("Failed to connect to database")?;

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("Failed to run migrations")?;

    Ok(pool)
}

/// Lightweight connectivity probe for health checks
pub async fn check_health(pool: &DbPool) -> Result<()> {
    sqlx::query("SELECT 1").fetch_one(pool).await?;
    Ok(())
}

/// Parse a stored timestamp; accepts RFC3339 and the bare format some
/// administrative imports use
pub(crate) fn parse_db_timestamp(ts: &str) -> Result<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(ts) {
        return Ok(dt.with_timezone(&Utc));
    }
    let dt = NaiveDateTime::parse_from_str(ts, "%Y-%m-%d %H:%M:%S")
        .with_context(|| format!("Invalid timestamp in database: {}", ts))?;
    Ok(DateTime::<Utc>::from_naive_utc_and_offset(dt, Utc))
}
