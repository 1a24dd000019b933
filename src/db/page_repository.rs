//! Content page repository

use chrono::Utc;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::db::parse_db_timestamp;
use crate::models::{slugify, Page};
use crate::utils::{AppError, AppResult};

const HOME_SLUG: &str = "home";

#[derive(Debug, sqlx::FromRow)]
struct PageRow {
    id: String,
    title: String,
    slug: String,
    content: String,
    is_active: i64,
    created_at: String,
    updated_at: String,
}

pub struct PageRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> PageRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Resolve an active page by slug; inactive pages are not found by URL
    /// regardless of existence
    pub async fn get_active_by_slug(&self, slug: &str) -> AppResult<Option<Page>> {
        let row = sqlx::query_as::<_, PageRow>(
            r#"
            SELECT id, title, slug, content, is_active, created_at, updated_at
            FROM pages
            WHERE slug = ? AND is_active = 1
            "#,
        )
        .bind(slug)
        .fetch_optional(self.pool)
        .await?;

        row.map(row_to_page).transpose()
    }

    /// Get the home page, creating a placeholder on first access.
    ///
    /// The insert ignores a concurrent creation of the same slug, so two
    /// simultaneous first visits converge on one record.
    pub async fn get_or_create_home(&self) -> AppResult<Page> {
        if let Some(page) = self.get_active_by_slug(HOME_SLUG).await? {
            return Ok(page);
        }

        let now = Utc::now().to_rfc3339();
        sqlx::query(
            r#"
            INSERT INTO pages (id, title, slug, content, is_active, created_at, updated_at)
            VALUES (?, 'Home', ?, '# Welcome', 1, ?, ?)
            ON CONFLICT(slug) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(HOME_SLUG)
        .bind(&now)
        .bind(&now)
        .execute(self.pool)
        .await?;

        self.get_active_by_slug(HOME_SLUG)
            .await?
            .ok_or_else(|| AppError::Internal("Home page missing after creation".to_string()))
    }

    pub async fn create(
        &self,
        title: &str,
        slug: Option<&str>,
        content: &str,
        is_active: bool,
    ) -> AppResult<Page> {
        let id = Uuid::new_v4();
        let slug = slug
            .map(str::to_string)
            .unwrap_or_else(|| slugify(title));
        let now = Utc::now();

        sqlx::query(
            r#"
            INSERT INTO pages (id, title, slug, content, is_active, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(id.to_string())
        .bind(title)
        .bind(&slug)
        .bind(content)
        .bind(is_active as i64)
        .bind(now.to_rfc3339())
        .bind(now.to_rfc3339())
        .execute(self.pool)
        .await?;

        Ok(Page {
            id,
            title: title.to_string(),
            slug,
            content: content.to_string(),
            is_active,
            created_at: now,
            updated_at: now,
        })
    }
}

fn row_to_page(row: PageRow) -> AppResult<Page> {
    Ok(Page {
        id: Uuid::parse_str(&row.id)
            .map_err(|_| AppError::Database(format!("Invalid page id: {}", row.id)))?,
        title: row.title,
        slug: row.slug,
        content: row.content,
        is_active: row.is_active != 0,
        created_at: parse_db_timestamp(&row.created_at)
            .map_err(|e| AppError::Database(e.to_string()))?,
        updated_at: parse_db_timestamp(&row.updated_at)
            .map_err(|e| AppError::Database(e.to_string()))?,
    })
}
