use axum::http::StatusCode;
use serde_json::{json, Value};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use settings_cell::settings_routes;
use shared_utils::test_utils::{TestClient, TestConfig, TestUser};

fn client(server: &MockServer) -> TestClient {
    let config = TestConfig::with_supabase_url(&server.uri());
    TestClient::new(settings_routes(config.to_arc()), &config)
}

fn settings_row(name: &str) -> Value {
    json!({
        "id": 1,
        "clinic_name": name,
        "clinic_description": null,
        "clinic_address": "Tehran",
        "clinic_phone": "021-12345678",
        "clinic_email": null,
        "working_hours": null,
        "created_at": "2024-01-01T00:00:00Z",
        "updated_at": null
    })
}

#[tokio::test]
async fn first_read_writes_defaults() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/settings"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/settings"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([settings_row("Clinic")])))
        .expect(1)
        .mount(&server)
        .await;

    let response = client(&server).get(&TestUser::patient(20), "/").await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.json["clinic_name"], "Clinic");

    let requests = server.received_requests().await.unwrap();
    let insert = requests.iter().find(|r| r.method.as_str() == "POST").unwrap();
    let body: Value = serde_json::from_slice(&insert.body).unwrap();
    assert_eq!(body[0]["clinic_phone"], "021-12345678");
}

#[tokio::test]
async fn existing_settings_are_returned_as_is() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/settings"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([settings_row("Hemophilia Care Clinic")])))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&server)
        .await;

    let response = client(&server).get(&TestUser::secretary(2), "/").await;
    assert_eq!(response.json["clinic_name"], "Hemophilia Care Clinic");
}

#[tokio::test]
async fn create_is_admin_only_and_refuses_second_row() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/settings"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([settings_row("Hemophilia Care Clinic")])))
        .mount(&server)
        .await;

    let client = client(&server);
    let body = json!({ "clinic_name": "Another" });

    assert_eq!(client.post(&TestUser::secretary(2), "/", body.clone()).await.status, StatusCode::FORBIDDEN);
    assert_eq!(client.post(&TestUser::admin(1), "/", body).await.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn update_without_settings_is_not_found() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/settings"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let response = client(&server)
        .put(&TestUser::admin(1), "/", json!({ "clinic_name": "Hemophilia Care Clinic" }))
        .await;

    assert_eq!(response.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn update_patches_the_stored_row() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/settings"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([settings_row("Clinic")])))
        .mount(&server)
        .await;

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/settings"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([settings_row("Hemophilia Care Clinic")])))
        .expect(1)
        .mount(&server)
        .await;

    let response = client(&server)
        .put(&TestUser::admin(1), "/", json!({ "clinic_name": "Hemophilia Care Clinic" }))
        .await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.json["clinic_name"], "Hemophilia Care Clinic");
}
