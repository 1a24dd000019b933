//! Error types and handling
//!
//! All errors are converted to a consistent JSON response format. Key
//! lifecycle failures carry a machine-readable code; gate denials also carry
//! a redirect hint pointing at the key management flow.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

/// Path the UI routes to when a user must (re)provision a key
pub const KEY_PAGE_PATH: &str = "/api-key";

/// Application error types
#[derive(Debug, Error)]
pub enum AppError {
    /// Resource not found (404)
    #[error("Not found: {0}")]
    NotFound(String),

    /// Bad request - invalid input (400)
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Unauthorized - authentication required (401)
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Unprocessable entity - validation failed (422)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Caller already owns a key record (409)
    #[error("This user already has an API key.")]
    DuplicateOwner,

    /// Key string already bound to another record (409)
    #[error("This key is already registered.")]
    DuplicateKey,

    /// Remote search returned no match (422)
    #[error("Key not found. Please enter a valid key.")]
    KeyNotFound,

    /// Remote search matched more than one key (422)
    #[error("Multiple keys were found. Please enter the complete key.")]
    AmbiguousKey,

    /// Remote key exists but is disabled (422)
    #[error("Key is disabled. Please use a new key.")]
    KeyDisabled,

    /// Remote match does not exactly equal the submitted key (422)
    #[error("Key is mismatched. Please contact support.")]
    KeyMismatch,

    /// Gated feature requested without a key record (403, redirect)
    #[error("Insufficient balance. Please provision an API key first.")]
    KeyRequired,

    /// Gated feature requested with an expired key (403, redirect)
    #[error("Your API key has expired. Please renew it.")]
    Expired,

    /// api2d unreachable or answered non-2xx (502)
    #[error("Key service unavailable: {0}")]
    RemoteUnavailable(String),

    /// System-issued provisioning requires at least one policy (503)
    #[error("No expiration policy configured")]
    NoPolicyConfigured,

    /// Database error (500)
    #[error("Database error: {0}")]
    Database(String),

    /// Internal server error (500)
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Error response body
#[derive(Serialize, Debug)]
pub struct ErrorResponse {
    /// Error type identifier
    pub error: String,
    /// Human-readable error message
    pub message: String,
    /// Additional error details (optional)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
    /// Error code for programmatic handling (optional)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
            details: None,
            code: None,
        }
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }
}

impl AppError {
    pub fn not_found(msg: impl Into<String>) -> Self {
        AppError::NotFound(msg.into())
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        AppError::BadRequest(msg.into())
    }

    pub fn unauthorized(msg: impl Into<String>) -> Self {
        AppError::Unauthorized(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        AppError::Internal(msg.into())
    }

    fn code(&self) -> &'static str {
        match self {
            AppError::NotFound(_) => "not_found",
            AppError::BadRequest(_) => "bad_request",
            AppError::Unauthorized(_) => "unauthorized",
            AppError::Validation(_) => "validation_error",
            AppError::DuplicateOwner => "duplicate_owner",
            AppError::DuplicateKey => "duplicate_key",
            AppError::KeyNotFound => "key_not_found",
            AppError::AmbiguousKey => "ambiguous_key",
            AppError::KeyDisabled => "key_disabled",
            AppError::KeyMismatch => "key_mismatch",
            AppError::KeyRequired => "key_required",
            AppError::Expired => "key_expired",
            AppError::RemoteUnavailable(_) => "remote_unavailable",
            AppError::NoPolicyConfigured => "no_policy_configured",
            AppError::Database(_) => "database_error",
            AppError::Internal(_) => "internal_error",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Validation(_)
            | AppError::KeyNotFound
            | AppError::AmbiguousKey
            | AppError::KeyDisabled
            | AppError::KeyMismatch => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::DuplicateOwner | AppError::DuplicateKey => StatusCode::CONFLICT,
            AppError::KeyRequired | AppError::Expired => StatusCode::FORBIDDEN,
            AppError::RemoteUnavailable(_) => StatusCode::BAD_GATEWAY,
            AppError::NoPolicyConfigured => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Database(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Gate denials route the user back to the key management flow
    fn redirect(&self) -> Option<&'static str> {
        match self {
            AppError::KeyRequired | AppError::Expired => Some(KEY_PAGE_PATH),
            _ => None,
        }
    }

    fn should_log(&self) -> bool {
        matches!(
            self,
            AppError::RemoteUnavailable(_)
                | AppError::NoPolicyConfigured
                | AppError::Database(_)
                | AppError::Internal(_)
        )
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let code = self.code();
        let status = self.status();

        if self.should_log() {
            error!(error = %self, error_type = code, "Request error");
        }

        let mut body = ErrorResponse::new(code, self.to_string()).with_code(code);
        if let Some(redirect) = self.redirect() {
            body = body.with_details(serde_json::json!({ "redirect": redirect }));
        }

        (status, Json(body)).into_response()
    }
}

// Implement From for common error types

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => AppError::NotFound("Record not found".to_string()),
            sqlx::Error::Database(db_err) => {
                // The UNIQUE constraints are the authoritative duplicate
                // guard; the pre-checks in the repository only produce the
                // same errors earlier.
                let msg = db_err.message();
                if msg.contains("UNIQUE constraint failed") {
                    if msg.contains("api_keys.user_id") {
                        AppError::DuplicateOwner
                    } else if msg.contains("api_keys.key") {
                        AppError::DuplicateKey
                    } else {
                        AppError::Validation("Resource already exists".to_string())
                    }
                } else {
                    AppError::Database(db_err.to_string())
                }
            }
            _ => AppError::Database(err.to_string()),
        }
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            AppError::RemoteUnavailable("request timed out".to_string())
        } else if err.is_connect() {
            AppError::RemoteUnavailable("connection failed".to_string())
        } else {
            AppError::RemoteUnavailable(err.to_string())
        }
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        AppError::Validation(err.to_string())
    }
}

/// Result type alias for handlers
pub type AppResult<T> = Result<T, AppError>;
