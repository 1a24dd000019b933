//! Banner notification model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Site-wide banner shown while its time window is open
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: Uuid,
    pub title: String,
    pub message: String,
    pub is_active: bool,
    pub start_date: DateTime<Utc>,
    /// Open-ended when null
    pub end_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    /// Window check: start has passed (inclusive) and end has not (inclusive)
    pub fn is_visible_at(&self, now: DateTime<Utc>) -> bool {
        self.is_active
            && self.start_date <= now
            && self.end_date.map(|end| end >= now).unwrap_or(true)
    }
}
