//! Test application setup utilities
//!
//! Spins up the full router against a throwaway SQLite database, with the
//! api2d service optionally stubbed by a wiremock server.

use std::sync::Arc;

use axum::{body::Body, http::Request, Router};
use chrono::{DateTime, Utc};
use tower::ServiceExt;
use uuid::Uuid;

use celprep_webui::{
    build_router,
    config::{
        Api2dConfig, AppConfig, AuthConfig, DatabaseConfig, FeatureConfig, LoggingConfig,
        ServerConfig,
    },
    db,
    middleware::auth::create_access_token,
    services::{Api2dClient, AuthService, KeyAuthority},
    AppState,
};

/// Test application wrapper for integration testing
pub struct TestApp {
    pub router: Router,
    pub state: AppState,
}

impl TestApp {
    /// Create a test application without a key service
    pub async fn new() -> Self {
        Self::build(test_config()).await
    }

    /// Create a test application whose api2d client points at a mock server
    pub async fn with_api2d(mock_base_url: &str) -> Self {
        let mut config = test_config();
        config.api2d = Some(Api2dConfig {
            url: mock_base_url.to_string(),
            admin_key: "fkadmin-test".to_string(),
            timeout_secs: 5,
            openai_endpoint: "https://openai.example.test".to_string(),
            claude_endpoint: "https://claude.example.test".to_string(),
        });
        Self::build(config).await
    }

    async fn build(config: AppConfig) -> Self {
        let db = db::init_pool(&config.database)
            .await
            .expect("Failed to initialize test database");

        let api2d: Option<Arc<dyn KeyAuthority>> = config.api2d.as_ref().map(|api2d_config| {
            Arc::new(Api2dClient::new(api2d_config).expect("Failed to build api2d client"))
                as Arc<dyn KeyAuthority>
        });

        let state = AppState {
            config,
            db,
            api2d,
        };

        let router = build_router(state.clone());

        Self { router, state }
    }

    /// Insert a user and return their id plus a valid access token
    pub async fn seed_user(&self, username: &str) -> (Uuid, String) {
        let hash = AuthService::hash_password("s3cure-password").unwrap();
        let user = celprep_webui::db::UserRepository::new(&self.state.db)
            .create(username, &format!("{}@example.com", username), &hash)
            .await
            .expect("Failed to seed user");

        let token = create_access_token(
            &user.id,
            &user.username,
            &user.email,
            &self.state.config.auth.jwt_secret,
            1,
        )
        .expect("Failed to issue test token");

        (user.id, token)
    }

    pub async fn seed_policy(&self, name: &str, type_id: &str, validate_days: i64) -> Uuid {
        celprep_webui::db::PolicyRepository::new(&self.state.db)
            .create(name, type_id, validate_days)
            .await
            .expect("Failed to seed policy")
            .id
    }

    pub async fn seed_api_key(
        &self,
        user_id: Uuid,
        key: &str,
        policy_id: Option<Uuid>,
        created_at: DateTime<Utc>,
        expired_at: Option<DateTime<Utc>>,
    ) {
        celprep_webui::db::ApiKeyRepository::new(&self.state.db)
            .create(user_id, key, policy_id, created_at, expired_at)
            .await
            .expect("Failed to seed api key");
    }

    /// Make a GET request
    pub async fn get(&self, uri: &str) -> TestResponse {
        self.request(
            Request::builder()
                .method("GET")
                .uri(uri)
                .body(Body::empty())
                .unwrap(),
        )
        .await
    }

    /// Make an authenticated GET request
    pub async fn get_auth(&self, uri: &str, token: &str) -> TestResponse {
        self.request(
            Request::builder()
                .method("GET")
                .uri(uri)
                .header("Authorization", format!("Bearer {}", token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
    }

    /// Make a POST request with JSON body
    pub async fn post_json(&self, uri: &str, body: serde_json::Value) -> TestResponse {
        self.request(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header("Content-Type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
    }

    /// Make an authenticated POST request with JSON body
    pub async fn post_json_auth(
        &self,
        uri: &str,
        body: serde_json::Value,
        token: &str,
    ) -> TestResponse {
        self.request(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header("Content-Type", "application/json")
                .header("Authorization", format!("Bearer {}", token))
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
    }

    /// Make an authenticated DELETE request
    pub async fn delete_auth(&self, uri: &str, token: &str) -> TestResponse {
        self.request(
            Request::builder()
                .method("DELETE")
                .uri(uri)
                .header("Authorization", format!("Bearer {}", token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
    }

    /// Make an arbitrary request
    pub async fn request(&self, request: Request<Body>) -> TestResponse {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to execute request");

        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("Failed to read response body");

        TestResponse { status, body }
    }
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    pub status: axum::http::StatusCode,
    pub body: bytes::Bytes,
}

impl TestResponse {
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).to_string()
    }

    pub fn json<T: serde::de::DeserializeOwned>(&self) -> T {
        serde_json::from_slice(&self.body).expect("Failed to parse response as JSON")
    }

    pub fn assert_status(&self, expected: axum::http::StatusCode) -> &Self {
        assert_eq!(
            self.status,
            expected,
            "Expected status {}, got {}. Body: {}",
            expected,
            self.status,
            self.text()
        );
        self
    }

    pub fn assert_ok(&self) -> &Self {
        self.assert_status(axum::http::StatusCode::OK)
    }

    pub fn assert_created(&self) -> &Self {
        self.assert_status(axum::http::StatusCode::CREATED)
    }

    pub fn assert_not_found(&self) -> &Self {
        self.assert_status(axum::http::StatusCode::NOT_FOUND)
    }

    pub fn assert_unauthorized(&self) -> &Self {
        self.assert_status(axum::http::StatusCode::UNAUTHORIZED)
    }

    /// Assert the JSON error body carries the given programmatic code
    pub fn assert_error_code(&self, code: &str) -> &Self {
        let json: serde_json::Value = self.json();
        assert_eq!(
            json["code"], code,
            "Expected error code {}, got body {}",
            code,
            self.text()
        );
        self
    }
}

/// Create a test configuration backed by a unique temporary SQLite file
pub fn test_config() -> AppConfig {
    let db_path = format!(
        "/tmp/celprep_test_{}.db",
        Uuid::new_v4().to_string().replace('-', "")
    );

    AppConfig {
        server: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            workers: 1,
            static_dir: None,
        },
        database: DatabaseConfig {
            url: format!("sqlite://{}?mode=rwc", db_path),
            max_connections: 1,
            connect_timeout_secs: 30,
        },
        auth: AuthConfig {
            jwt_secret: "test_secret_key_that_is_at_least_32_bytes_long".to_string(),
            token_expiry_hours: 24,
            password_min_length: 8,
        },
        logging: LoggingConfig::default(),
        api2d: None,
        features: FeatureConfig::default(),
    }
}
