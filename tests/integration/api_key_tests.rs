//! Key lifecycle integration tests

use chrono::{DateTime, Duration, Utc};
use wiremock::MockServer;

use crate::common::{self, TestApp};
use celprep_webui::db::{ApiKeyRepository, PolicyRepository};

const KEY: &str = "fk4242424242424242";
const CREATED_AT: &str = "2025-06-01T10:00:00Z";

#[tokio::test]
async fn test_bind_key_with_matching_policy() {
    let server = MockServer::start().await;
    let app = TestApp::with_api2d(&server.uri()).await;
    let (user_id, token) = app.seed_user("mila").await;
    app.seed_policy("monthly", "fk-month", 30).await;

    common::mount_search(
        &server,
        vec![common::descriptor(KEY, "fk-month", CREATED_AT, true)],
    )
    .await;

    let response = app
        .post_json_auth("/api/v1/api-key", serde_json::json!({ "key": KEY }), &token)
        .await;
    response.assert_created();

    let json: serde_json::Value = response.json();
    assert_eq!(json["key"], KEY);

    // The record keeps the remote creation instant and derives expiration
    // from the policy's validity period.
    let record = ApiKeyRepository::new(&app.state.db)
        .get_by_user(user_id)
        .await
        .unwrap()
        .expect("record should exist");
    let created_at: DateTime<Utc> = CREATED_AT.parse().unwrap();
    assert_eq!(record.created_at, created_at);
    assert_eq!(record.expired_at, Some(created_at + Duration::days(30)));
    assert!(record.policy_id.is_some());
}

#[tokio::test]
async fn test_bind_key_without_matching_policy_soft_fails() {
    let server = MockServer::start().await;
    let app = TestApp::with_api2d(&server.uri()).await;
    let (user_id, token) = app.seed_user("mila").await;
    app.seed_policy("monthly", "fk-month", 30).await;

    common::mount_search(
        &server,
        vec![common::descriptor(KEY, "fk-unknown-tier", CREATED_AT, true)],
    )
    .await;

    app.post_json_auth("/api/v1/api-key", serde_json::json!({ "key": KEY }), &token)
        .await
        .assert_created();

    let record = ApiKeyRepository::new(&app.state.db)
        .get_by_user(user_id)
        .await
        .unwrap()
        .unwrap();
    assert!(record.policy_id.is_none());
    assert!(record.expired_at.is_none());
}

#[tokio::test]
async fn test_bind_unknown_key_rejected() {
    let server = MockServer::start().await;
    let app = TestApp::with_api2d(&server.uri()).await;
    let (_, token) = app.seed_user("mila").await;

    common::mount_search(&server, vec![]).await;

    app.post_json_auth("/api/v1/api-key", serde_json::json!({ "key": KEY }), &token)
        .await
        .assert_status(axum::http::StatusCode::UNPROCESSABLE_ENTITY)
        .assert_error_code("key_not_found");
}

#[tokio::test]
async fn test_bind_partial_key_with_multiple_matches_rejected() {
    let server = MockServer::start().await;
    let app = TestApp::with_api2d(&server.uri()).await;
    let (_, token) = app.seed_user("mila").await;

    common::mount_search(
        &server,
        vec![
            common::descriptor("fk4242424242424242aa", "fk-month", CREATED_AT, true),
            common::descriptor("fk4242424242424242bb", "fk-month", CREATED_AT, true),
        ],
    )
    .await;

    app.post_json_auth("/api/v1/api-key", serde_json::json!({ "key": KEY }), &token)
        .await
        .assert_status(axum::http::StatusCode::UNPROCESSABLE_ENTITY)
        .assert_error_code("ambiguous_key");
}

#[tokio::test]
async fn test_bind_disabled_key_rejected() {
    let server = MockServer::start().await;
    let app = TestApp::with_api2d(&server.uri()).await;
    let (_, token) = app.seed_user("mila").await;

    common::mount_search(
        &server,
        vec![common::descriptor(KEY, "fk-month", CREATED_AT, false)],
    )
    .await;

    app.post_json_auth("/api/v1/api-key", serde_json::json!({ "key": KEY }), &token)
        .await
        .assert_status(axum::http::StatusCode::UNPROCESSABLE_ENTITY)
        .assert_error_code("key_disabled");
}

#[tokio::test]
async fn test_bind_mismatched_single_match_rejected() {
    let server = MockServer::start().await;
    let app = TestApp::with_api2d(&server.uri()).await;
    let (_, token) = app.seed_user("mila").await;

    // A single partial match that is not byte-equal to the submitted key
    common::mount_search(
        &server,
        vec![common::descriptor(
            "fk4242424242424242-longer",
            "fk-month",
            CREATED_AT,
            true,
        )],
    )
    .await;

    app.post_json_auth("/api/v1/api-key", serde_json::json!({ "key": KEY }), &token)
        .await
        .assert_status(axum::http::StatusCode::UNPROCESSABLE_ENTITY)
        .assert_error_code("key_mismatch");
}

#[tokio::test]
async fn test_bind_rejected_when_user_already_has_key() {
    let server = MockServer::start().await;
    let app = TestApp::with_api2d(&server.uri()).await;
    let (user_id, token) = app.seed_user("mila").await;
    app.seed_api_key(user_id, "fk-existing-key-111", None, Utc::now(), None)
        .await;

    app.post_json_auth("/api/v1/api-key", serde_json::json!({ "key": KEY }), &token)
        .await
        .assert_status(axum::http::StatusCode::CONFLICT)
        .assert_error_code("duplicate_owner");
}

#[tokio::test]
async fn test_bind_rejected_when_key_taken_by_other_user() {
    let server = MockServer::start().await;
    let app = TestApp::with_api2d(&server.uri()).await;
    let (other_id, _) = app.seed_user("taken").await;
    app.seed_api_key(other_id, KEY, None, Utc::now(), None).await;

    let (_, token) = app.seed_user("mila").await;
    app.post_json_auth("/api/v1/api-key", serde_json::json!({ "key": KEY }), &token)
        .await
        .assert_status(axum::http::StatusCode::CONFLICT)
        .assert_error_code("duplicate_key");
}

#[tokio::test]
async fn test_get_api_key_provisions_on_first_visit() {
    let server = MockServer::start().await;
    let app = TestApp::with_api2d(&server.uri()).await;
    let (user_id, token) = app.seed_user("mila").await;
    app.seed_policy("monthly", "fk-month", 30).await;

    common::mount_save(
        &server,
        vec![common::descriptor("fk-fresh-key-00001", "fk-month", CREATED_AT, true)],
    )
    .await;

    let response = app.get_auth("/api/v1/api-key", &token).await;
    response.assert_ok();
    let json: serde_json::Value = response.json();
    assert_eq!(json["api_key"]["key"], "fk-fresh-key-00001");
    assert_eq!(json["api_key"]["expired"], false);

    // System-issued records expire validity_days after provisioning
    let record = ApiKeyRepository::new(&app.state.db)
        .get_by_user(user_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(
        record.expired_at,
        Some(record.created_at + Duration::days(30))
    );

    // Second visit returns the same record instead of provisioning again
    let again = app.get_auth("/api/v1/api-key", &token).await;
    again.assert_ok();
    let json: serde_json::Value = again.json();
    assert_eq!(json["api_key"]["key"], "fk-fresh-key-00001");
}

#[tokio::test]
async fn test_provisioning_requires_a_policy() {
    let server = MockServer::start().await;
    let app = TestApp::with_api2d(&server.uri()).await;
    let (_, token) = app.seed_user("mila").await;

    app.get_auth("/api/v1/api-key", &token)
        .await
        .assert_status(axum::http::StatusCode::SERVICE_UNAVAILABLE)
        .assert_error_code("no_policy_configured");
}

#[tokio::test]
async fn test_provisioning_failure_creates_no_record() {
    let server = MockServer::start().await;
    let app = TestApp::with_api2d(&server.uri()).await;
    let (user_id, token) = app.seed_user("mila").await;
    app.seed_policy("monthly", "fk-month", 30).await;

    common::mount_save_failure(&server, 500).await;

    app.get_auth("/api/v1/api-key", &token)
        .await
        .assert_status(axum::http::StatusCode::BAD_GATEWAY)
        .assert_error_code("remote_unavailable");

    let record = ApiKeyRepository::new(&app.state.db)
        .get_by_user(user_id)
        .await
        .unwrap();
    assert!(record.is_none());
}

#[tokio::test]
async fn test_provisioning_without_key_service_creates_no_record() {
    let app = TestApp::new().await;
    let (user_id, token) = app.seed_user("mila").await;
    app.seed_policy("monthly", "fk-month", 30).await;

    app.get_auth("/api/v1/api-key", &token)
        .await
        .assert_status(axum::http::StatusCode::BAD_GATEWAY)
        .assert_error_code("remote_unavailable");

    let record = ApiKeyRepository::new(&app.state.db)
        .get_by_user(user_id)
        .await
        .unwrap();
    assert!(record.is_none());
}

#[tokio::test]
async fn test_delete_works_without_key_service() {
    let app = TestApp::new().await;
    let (user_id, token) = app.seed_user("mila").await;
    app.seed_api_key(user_id, KEY, None, Utc::now(), None).await;

    app.delete_auth("/api/v1/api-key", &token).await.assert_ok();
}

#[tokio::test]
async fn test_delete_own_key() {
    let server = MockServer::start().await;
    let app = TestApp::with_api2d(&server.uri()).await;
    let (user_id, token) = app.seed_user("mila").await;
    app.seed_api_key(user_id, KEY, None, Utc::now(), None).await;

    app.delete_auth("/api/v1/api-key", &token).await.assert_ok();

    let record = ApiKeyRepository::new(&app.state.db)
        .get_by_user(user_id)
        .await
        .unwrap();
    assert!(record.is_none());

    // Deleting again reports there is nothing to delete
    app.delete_auth("/api/v1/api-key", &token)
        .await
        .assert_not_found();
}

#[tokio::test]
async fn test_key_endpoints_require_authentication() {
    let app = TestApp::new().await;
    app.get("/api/v1/api-key").await.assert_unauthorized();
    app.post_json("/api/v1/api-key", serde_json::json!({ "key": KEY }))
        .await
        .assert_unauthorized();
}

#[tokio::test]
async fn test_store_enforces_one_record_per_user() {
    let app = TestApp::new().await;
    let (user_id, _) = app.seed_user("mila").await;

    let repo = ApiKeyRepository::new(&app.state.db);
    repo.create(user_id, "fk-first-key-00001", None, Utc::now(), None)
        .await
        .unwrap();

    let err = repo
        .create(user_id, "fk-second-key-0001", None, Utc::now(), None)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        celprep_webui::utils::AppError::DuplicateOwner
    ));
}

#[tokio::test]
async fn test_store_enforces_unique_key_strings() {
    let app = TestApp::new().await;
    let (first, _) = app.seed_user("mila").await;
    let (second, _) = app.seed_user("ivan").await;

    let repo = ApiKeyRepository::new(&app.state.db);
    repo.create(first, KEY, None, Utc::now(), None).await.unwrap();

    let err = repo.create(second, KEY, None, Utc::now(), None).await.unwrap_err();
    assert!(matches!(err, celprep_webui::utils::AppError::DuplicateKey));
}

#[tokio::test]
async fn test_explicit_expiration_is_preserved() {
    let app = TestApp::new().await;
    let (user_id, _) = app.seed_user("mila").await;
    let explicit = Utc::now() + Duration::days(7);

    let repo = ApiKeyRepository::new(&app.state.db);
    repo.create(user_id, KEY, None, Utc::now(), Some(explicit))
        .await
        .unwrap();

    let stored = repo.get_by_user(user_id).await.unwrap().unwrap();
    assert_eq!(
        stored.expired_at.map(|dt| dt.timestamp()),
        Some(explicit.timestamp())
    );
}

#[tokio::test]
async fn test_policy_lookups() {
    let app = TestApp::new().await;
    app.seed_policy("trial", "fk-trial", 7).await;
    app.seed_policy("monthly", "fk-month", 30).await;

    let repo = PolicyRepository::new(&app.state.db);

    let by_name = repo.get_by_name("monthly").await.unwrap().unwrap();
    assert_eq!(by_name.type_id, "fk-month");
    assert!(repo.get_by_name("yearly").await.unwrap().is_none());

    let by_type = repo.get_by_type_id("fk-trial").await.unwrap().unwrap();
    assert_eq!(by_type.name, "trial");

    // The default for system-issued provisioning is the oldest policy
    let default = repo.first().await.unwrap().unwrap();
    assert_eq!(default.name, "trial");
}

#[tokio::test]
async fn test_policy_deletion_cascades_to_key_records() {
    let app = TestApp::new().await;
    let (user_id, _) = app.seed_user("mila").await;
    let policy_id = app.seed_policy("monthly", "fk-month", 30).await;
    app.seed_api_key(user_id, KEY, Some(policy_id), Utc::now(), None)
        .await;

    PolicyRepository::new(&app.state.db)
        .delete(policy_id)
        .await
        .unwrap();

    let record = ApiKeyRepository::new(&app.state.db)
        .get_by_user(user_id)
        .await
        .unwrap();
    assert!(record.is_none(), "cascade should remove dependent records");
}
