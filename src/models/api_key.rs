//! API key record models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Local binding of one user to one remotely issued key
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiKeyRecord {
    pub id: Uuid,
    pub key: String,
    pub user_id: Uuid,
    /// Policy reference; null when the key was bound without a matching
    /// policy (expiration stays unset in that case)
    pub policy_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub expired_at: Option<DateTime<Utc>>,
}

impl ApiKeyRecord {
    /// A record with no expiration never expires
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        matches!(self.expired_at, Some(expired_at) if expired_at < now)
    }
}

/// Request to bind a key the user already possesses
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct BindApiKeyRequest {
    #[validate(length(min = 8, max = 100, message = "key must be 8-100 characters"))]
    pub key: String,
}

/// Key record as returned to the owning user
#[derive(Debug, Clone, Serialize)]
pub struct ApiKeyView {
    pub key: String,
    pub created_at: DateTime<Utc>,
    pub expired_at: Option<DateTime<Utc>>,
    pub expired: bool,
}

impl ApiKeyView {
    pub fn from_record(record: &ApiKeyRecord, now: DateTime<Utc>) -> Self {
        Self {
            key: record.key.clone(),
            created_at: record.created_at,
            expired_at: record.expired_at,
            expired: record.is_expired_at(now),
        }
    }
}
