//! wiremock stand-in for the api2d key service

use serde_json::{json, Value};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Build a remote key descriptor as the service returns it
pub fn descriptor(key: &str, type_id: &str, created_at: &str, enabled: bool) -> Value {
    json!({
        "id": 101,
        "uid": 7,
        "key": key,
        "type_id": type_id,
        "created_at": created_at,
        "enabled": enabled,
    })
}

fn envelope(descriptors: Vec<Value>) -> Value {
    json!({ "data": { "custom_key_array": descriptors } })
}

/// Stub the search endpoint with a fixed result set
pub async fn mount_search(server: &MockServer, descriptors: Vec<Value>) {
    Mock::given(method("POST"))
        .and(path("/custom_key/search_key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(envelope(descriptors)))
        .mount(server)
        .await;
}

/// Stub the issuance endpoint with a fixed result set
pub async fn mount_save(server: &MockServer, descriptors: Vec<Value>) {
    Mock::given(method("POST"))
        .and(path("/custom_key/save"))
        .respond_with(ResponseTemplate::new(200).set_body_json(envelope(descriptors)))
        .mount(server)
        .await;
}

/// Stub the issuance endpoint with a server-side failure
pub async fn mount_save_failure(server: &MockServer, status: u16) {
    Mock::given(method("POST"))
        .and(path("/custom_key/save"))
        .respond_with(ResponseTemplate::new(status))
        .mount(server)
        .await;
}
