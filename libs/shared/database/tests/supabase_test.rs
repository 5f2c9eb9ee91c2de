use assert_matches::assert_matches;
use serde_json::{json, Value};
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use shared_config::{default_cors_origins, AppConfig};
use shared_database::{DatabaseError, SupabaseClient};

fn client_for(server: &MockServer) -> SupabaseClient {
    let config = AppConfig {
        app_name: "test".to_string(),
        supabase_url: server.uri(),
        supabase_service_key: "service-key".to_string(),
        jwt_secret: "secret".to_string(),
        access_token_expire_minutes: 30,
        refresh_token_expire_days: 7,
        cors_origins: default_cors_origins(),
        server_port: 8000,
    };
    SupabaseClient::new(&config)
}

#[tokio::test]
async fn select_sends_service_key_headers() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/medications"))
        .and(query_param("id", "eq.3"))
        .and(header("apikey", "service-key"))
        .and(header("authorization", "Bearer service-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{ "id": 3, "name": "Aspirin" }])))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let row: Option<Value> = client.select_one("medications", "id=eq.3").await.unwrap();

    assert_eq!(row.unwrap()["name"], "Aspirin");
}

#[tokio::test]
async fn insert_asks_for_representation() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/medications"))
        .and(header("prefer", "return=representation"))
        .and(body_json(json!([{ "name": "Aspirin" }])))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([{ "id": 9, "name": "Aspirin" }])))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let row: Value = client.insert("medications", json!({ "name": "Aspirin" })).await.unwrap();

    assert_eq!(row["id"], 9);
}

#[tokio::test]
async fn unique_violation_becomes_conflict() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/users"))
        .respond_with(ResponseTemplate::new(409).set_body_json(json!({
            "code": "23505",
            "message": "duplicate key value violates unique constraint \"users_phone_number_key\"",
            "details": null,
            "hint": null
        })))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let err = client.insert::<Value>("users", json!({ "phone_number": "09120000000" })).await.unwrap_err();

    assert!(err.is_unique_violation());
    assert_matches!(err, DatabaseError::Conflict { .. });
}

#[tokio::test]
async fn delete_counts_removed_rows() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/rest/v1/factors"))
        .and(query_param("id", "eq.5"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{ "id": 5 }])))
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/rest/v1/factors"))
        .and(query_param("id", "eq.6"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let client = client_for(&server);

    assert_eq!(client.delete("factors", "id=eq.5").await.unwrap(), 1);
    assert_eq!(client.delete("factors", "id=eq.6").await.unwrap(), 0);
}

#[tokio::test]
async fn server_errors_keep_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/patients"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let err = client.select::<Value>("patients", "").await.unwrap_err();

    assert_matches!(err, DatabaseError::Api { status: 500, .. });
}
