//! api2d key service client
//!
//! Thin HTTP client for the external key management API. Transport failures
//! (non-2xx, timeout, connection errors) all collapse into the single
//! remote-unavailable error kind so callers never see transport detail.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};

use crate::config::Api2dConfig;
use crate::utils::{AppError, AppResult};

/// Remote creation timestamps arrive either as text or as epoch seconds
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RemoteTimestamp {
    EpochSeconds(i64),
    Text(String),
}

impl RemoteTimestamp {
    /// Parse into a concrete instant; text must be parsed before any
    /// expiration arithmetic happens
    pub fn parse(&self) -> AppResult<DateTime<Utc>> {
        match self {
            RemoteTimestamp::EpochSeconds(secs) => DateTime::<Utc>::from_timestamp(*secs, 0)
                .ok_or_else(|| {
                    AppError::Validation(format!("Remote timestamp out of range: {}", secs))
                }),
            RemoteTimestamp::Text(text) => {
                if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
                    return Ok(dt.with_timezone(&Utc));
                }
                NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S")
                    .map(|dt| DateTime::<Utc>::from_naive_utc_and_offset(dt, Utc))
                    .map_err(|_| {
                        AppError::Validation(format!("Unparseable remote timestamp: {}", text))
                    })
            }
        }
    }
}

/// Transient descriptor of a remotely managed key
///
/// Produced by a lookup or issuance call, consumed once to construct or
/// validate a local record, never persisted.
#[derive(Debug, Clone, Deserialize)]
pub struct RemoteKeyDescriptor {
    pub id: i64,
    pub uid: i64,
    pub key: String,
    pub type_id: String,
    pub created_at: RemoteTimestamp,
    pub enabled: bool,
}

#[derive(Debug, Serialize)]
struct SaveKeyRequest<'a> {
    type_id: &'a str,
    n: u32,
}

#[derive(Debug, Serialize)]
struct SearchKeyRequest<'a> {
    query: &'a str,
}

#[derive(Debug, Deserialize)]
struct KeyEnvelope {
    data: KeyArrayData,
}

#[derive(Debug, Deserialize)]
struct KeyArrayData {
    custom_key_array: Vec<RemoteKeyDescriptor>,
}

/// Narrow interface over the remote key service
///
/// The lifecycle manager is written against this trait, which keeps the
/// orchestration rules testable with a substitutable fake.
#[async_trait]
pub trait KeyAuthority: Send + Sync {
    /// Request `count` freshly issued keys of the given type
    async fn issue(&self, type_id: &str, count: u32) -> AppResult<Vec<RemoteKeyDescriptor>>;

    /// Search by a possibly partial key string; zero, one or many matches
    async fn lookup(&self, query: &str) -> AppResult<Vec<RemoteKeyDescriptor>>;

    /// Exactly-one-match lookup of a full key string.
    ///
    /// The final equality check defends against partial-match false
    /// positives from the search endpoint.
    async fn resolve(&self, key: &str) -> AppResult<RemoteKeyDescriptor> {
        let mut matches = self.lookup(key).await?;
        match matches.len() {
            0 => Err(AppError::KeyNotFound),
            1 => {
                let descriptor = matches.remove(0);
                if !descriptor.enabled {
                    return Err(AppError::KeyDisabled);
                }
                if descriptor.key != key {
                    return Err(AppError::KeyMismatch);
                }
                Ok(descriptor)
            }
            _ => Err(AppError::AmbiguousKey),
        }
    }
}

/// HTTP client for the api2d key management API
#[derive(Clone)]
pub struct Api2dClient {
    client: Client,
    base_url: String,
    admin_key: String,
}

impl Api2dClient {
    pub fn new(config: &Api2dConfig) -> anyhow::Result<Self> {
        info!("Initializing api2d client for {}", config.url);

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .use_rustls_tls()
            .build()?;

        Ok(Self {
            client,
            base_url: config.url.trim_end_matches('/').to_string(),
            admin_key: config.admin_key.clone(),
        })
    }

    async fn post_for_keys<B: Serialize + Sync>(
        &self,
        path: &str,
        body: &B,
    ) -> AppResult<Vec<RemoteKeyDescriptor>> {
        let url = format!("{}{}", self.base_url, path);
        debug!(url = %url, "api2d request");

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.admin_key)
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::RemoteUnavailable(format!(
                "{} returned {}",
                path, status
            )));
        }

        let envelope: KeyEnvelope = response
            .json()
            .await
            .map_err(|e| AppError::RemoteUnavailable(format!("malformed response: {}", e)))?;

        Ok(envelope.data.custom_key_array)
    }
}

#[async_trait]
impl KeyAuthority for Api2dClient {
    async fn issue(&self, type_id: &str, count: u32) -> AppResult<Vec<RemoteKeyDescriptor>> {
        self.post_for_keys("/custom_key/save", &SaveKeyRequest { type_id, n: count })
            .await
    }

    async fn lookup(&self, query: &str) -> AppResult<Vec<RemoteKeyDescriptor>> {
        self.post_for_keys("/custom_key/search_key", &SearchKeyRequest { query })
            .await
    }
}
