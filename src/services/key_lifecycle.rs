//! Key lifecycle orchestration
//!
//! Two provisioning protocols share this service: binding a key the user
//! already possesses, and system-issued provisioning from the default
//! policy. Both end in the same record-creation path with the same
//! expiration rule.

use chrono::{DateTime, Duration, Utc};
use tracing::{info, warn};
use uuid::Uuid;

use crate::db::{ApiKeyRepository, DbPool, PolicyRepository};
use crate::models::{ApiKeyRecord, ExpirationPolicy};
use crate::services::api2d::KeyAuthority;
use crate::utils::{AppError, AppResult};

pub struct KeyLifecycleService<'a> {
    pool: &'a DbPool,
    authority: Option<&'a dyn KeyAuthority>,
}

impl<'a> KeyLifecycleService<'a> {
    pub fn new(pool: &'a DbPool, authority: Option<&'a dyn KeyAuthority>) -> Self {
        Self { pool, authority }
    }

    /// Remote operations need a configured key service; local ones do not
    fn authority(&self) -> AppResult<&'a dyn KeyAuthority> {
        self.authority
            .ok_or_else(|| AppError::RemoteUnavailable("key service not configured".to_string()))
    }

    /// Bind a key the user already possesses to their account.
    ///
    /// The submitted key is validated against the remote service before any
    /// local write. A missing policy for the resolved key type does not
    /// block binding; the record is created with a null policy reference
    /// and no expiration.
    pub async fn bind_submitted_key(&self, user_id: Uuid, key: &str) -> AppResult<ApiKeyRecord> {
        let keys = ApiKeyRepository::new(self.pool);
        if keys.get_by_user(user_id).await?.is_some() {
            return Err(AppError::DuplicateOwner);
        }
        if keys.get_by_key(key).await?.is_some() {
            return Err(AppError::DuplicateKey);
        }

        let descriptor = self.authority()?.resolve(key).await?;

        let policy = PolicyRepository::new(self.pool)
            .get_by_type_id(&descriptor.type_id)
            .await?;
        if policy.is_none() {
            warn!(
                type_id = %descriptor.type_id,
                "No policy matches remote key type; binding without expiration"
            );
        }

        // The record keeps the key's original creation instant, not the
        // binding instant.
        let created_at = descriptor.created_at.parse()?;
        let expired_at = compute_expiration(created_at, policy.as_ref());

        let record = keys
            .create(
                user_id,
                key,
                policy.as_ref().map(|p| p.id),
                created_at,
                expired_at,
            )
            .await?;

        info!(user_id = %user_id, "Bound user-submitted key");
        Ok(record)
    }

    /// Issue a fresh key from the default policy and bind it.
    ///
    /// Unlike binding, this path cannot proceed without a policy: there is
    /// no key type to request otherwise. No record is created when issuance
    /// fails, and no retry is attempted.
    pub async fn provision_key(&self, user_id: Uuid) -> AppResult<ApiKeyRecord> {
        let policy = PolicyRepository::new(self.pool)
            .first()
            .await?
            .ok_or(AppError::NoPolicyConfigured)?;

        let mut issued = self.authority()?.issue(&policy.type_id, 1).await?;
        let descriptor = issued
            .pop()
            .ok_or_else(|| AppError::RemoteUnavailable("service issued no keys".to_string()))?;

        let created_at = Utc::now();
        let expired_at = compute_expiration(created_at, Some(&policy));

        let record = ApiKeyRepository::new(self.pool)
            .create(
                user_id,
                &descriptor.key,
                Some(policy.id),
                created_at,
                expired_at,
            )
            .await?;

        info!(user_id = %user_id, policy = %policy.name, "Provisioned system-issued key");
        Ok(record)
    }

    /// Get-or-create semantics for the key management page: an existing
    /// record is returned as-is, otherwise a key is provisioned.
    pub async fn get_or_provision(&self, user_id: Uuid) -> AppResult<ApiKeyRecord> {
        if let Some(record) = ApiKeyRepository::new(self.pool).get_by_user(user_id).await? {
            return Ok(record);
        }
        self.provision_key(user_id).await
    }

    /// Remove the caller's record; the remote key itself is untouched
    pub async fn delete_key(&self, user_id: Uuid) -> AppResult<()> {
        let deleted = ApiKeyRepository::new(self.pool)
            .delete_by_user(user_id)
            .await?;
        if !deleted {
            return Err(AppError::not_found("You have no API key to delete"));
        }
        info!(user_id = %user_id, "Deleted key record");
        Ok(())
    }
}

/// Expiration rule shared by both protocols: a positive validity period
/// yields `created_at + validity_days`, otherwise expiration stays unset.
/// Once stored, an expiration is never recomputed.
pub fn compute_expiration(
    created_at: DateTime<Utc>,
    policy: Option<&ExpirationPolicy>,
) -> Option<DateTime<Utc>> {
    policy
        .filter(|p| p.validate_days > 0)
        .map(|p| created_at + Duration::days(p.validate_days))
}
