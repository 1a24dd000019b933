//! Expiration policy model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Subscription tier mapped to a remote key type and a validity period
///
/// Created and edited by administrators; read-only to end users. Deleting a
/// policy cascades to the key records bound to it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExpirationPolicy {
    pub id: Uuid,
    /// Unique tier name, e.g. "monthly" or "trial"
    pub name: String,
    /// Key type identifier understood by the remote service
    pub type_id: String,
    /// Validity period in days; drives expiration computation
    pub validate_days: i64,
    pub created_at: DateTime<Utc>,
}
