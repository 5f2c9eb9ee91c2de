use axum::http::StatusCode;
use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use patient_cell::patient_routes;
use shared_utils::test_utils::{MockSupabaseResponses, TestClient, TestConfig, TestUser};

async fn client(server: &MockServer) -> TestClient {
    let config = TestConfig::with_supabase_url(&server.uri());
    TestClient::new(patient_routes(config.to_arc()), &config)
}

#[tokio::test]
async fn create_patient_for_existing_user() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/users"))
        .and(query_param("id", "eq.20"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{ "id": 20 }])))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/patients"))
        .and(query_param("user_id", "eq.20"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/patients"))
        .and(body_partial_json(json!([{ "user_id": 20, "national_code": "0012345678" }])))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([
            MockSupabaseResponses::patient_response(4, 20, "Sara Ahmadi")
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let client = client(&server).await;
    let response = client
        .post(
            &TestUser::secretary(2),
            "/",
            json!({ "user_id": 20, "national_code": "0012345678", "blood_type": "O+" }),
        )
        .await;

    assert_eq!(response.status, StatusCode::CREATED);
    assert_eq!(response.json["id"], 4);
    assert_eq!(response.json["blood_type"], "O+");
}

#[tokio::test]
async fn create_patient_for_unknown_user_is_not_found() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/users"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let client = client(&server).await;
    let response = client.post(&TestUser::admin(1), "/", json!({ "user_id": 77 })).await;

    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(response.json["error"], "User not found");
}

#[tokio::test]
async fn user_can_only_be_registered_once() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/users"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{ "id": 20 }])))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/patients"))
        .and(query_param("user_id", "eq.20"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::patient_response(4, 20, "Sara Ahmadi")
        ])))
        .mount(&server)
        .await;

    let client = client(&server).await;
    let response = client.post(&TestUser::secretary(2), "/", json!({ "user_id": 20 })).await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn malformed_national_code_is_rejected_before_storage() {
    let server = MockServer::start().await;
    let client = client(&server).await;

    let response = client
        .post(&TestUser::secretary(2), "/", json!({ "user_id": 20, "national_code": "123" }))
        .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn list_includes_user_name_and_phone() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/patients"))
        .and(query_param("select", "*,user:users(full_name,phone_number)"))
        .and(query_param("limit", "100"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::patient_response(4, 20, "Sara Ahmadi"),
            MockSupabaseResponses::patient_response(5, 21, "Reza Karimi"),
        ])))
        .mount(&server)
        .await;

    let client = client(&server).await;
    let response = client.get(&TestUser::secretary(2), "/").await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.json[1]["user_full_name"], "Reza Karimi");
    assert_eq!(response.json[1]["user_phone"], "09120000000");
    assert!(response.json[1].get("user").is_none());
}

#[tokio::test]
async fn patients_read_only_their_own_record() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/patients"))
        .and(query_param("user_id", "eq.20"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::patient_response(4, 20, "Sara Ahmadi")
        ])))
        .mount(&server)
        .await;

    let client = client(&server).await;
    let me = client.get(&TestUser::patient(20), "/me").await;
    assert_eq!(me.status, StatusCode::OK);
    assert_eq!(me.json["user_id"], 20);

    let other = client.get(&TestUser::patient(20), "/5").await;
    assert_eq!(other.status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn update_sends_only_supplied_fields() {
    let server = MockServer::start().await;

    let mut updated = MockSupabaseResponses::patient_response(4, 20, "Sara Ahmadi");
    updated["address"] = json!("7 Enghelab Sq");
    Mock::given(method("PATCH"))
        .and(path("/rest/v1/patients"))
        .and(query_param("id", "eq.4"))
        .and(body_partial_json(json!({ "address": "7 Enghelab Sq" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([updated])))
        .expect(1)
        .mount(&server)
        .await;

    let client = client(&server).await;
    let response = client
        .put(&TestUser::admin(1), "/4", json!({ "address": "7 Enghelab Sq" }))
        .await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.json["address"], "7 Enghelab Sq");

    let requests = server.received_requests().await.unwrap();
    let patch: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert!(patch.get("gender").is_none());
    assert!(patch.get("updated_at").is_some());
}

#[tokio::test]
async fn delete_unknown_patient_is_not_found() {
    let server = MockServer::start().await;

    Mock::given(method("DELETE"))
        .and(path("/rest/v1/patients"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let client = client(&server).await;
    let response = client.delete(&TestUser::secretary(2), "/99").await;

    assert_eq!(response.status, StatusCode::NOT_FOUND);
}
