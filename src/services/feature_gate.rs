//! Feature gate
//!
//! Gated feature pages require a current key record. Denials carry a
//! redirect hint toward the key management flow rather than a bare error,
//! so the UI can route the user to provisioning.

use chrono::Utc;
use uuid::Uuid;

use crate::db::{ApiKeyRepository, DbPool};
use crate::models::ApiKeyRecord;
use crate::utils::{AppError, AppResult};

pub struct FeatureGate<'a> {
    pool: &'a DbPool,
}

impl<'a> FeatureGate<'a> {
    pub fn new(pool: &'a DbPool) -> Self {
        Self { pool }
    }

    /// Grant access when the caller holds a non-expired key record.
    ///
    /// A record with no expiration set never expires.
    pub async fn authorize(&self, user_id: Uuid) -> AppResult<ApiKeyRecord> {
        let record = ApiKeyRepository::new(self.pool)
            .get_by_user(user_id)
            .await?
            .ok_or(AppError::KeyRequired)?;

        if record.is_expired_at(Utc::now()) {
            return Err(AppError::Expired);
        }

        Ok(record)
    }
}
