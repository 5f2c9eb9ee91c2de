use axum::http::StatusCode;
use serde_json::{json, Value};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use auth_cell::auth_routes;
use shared_models::auth::TokenType;
use shared_utils::jwt::validate_token;
use shared_utils::password::hash_password;
use shared_utils::test_utils::{JwtTestUtils, MockSupabaseResponses, TestClient, TestConfig, TestUser};

const PHONE: &str = "09121234567";

fn user_row(is_active: bool) -> Value {
    let mut row = MockSupabaseResponses::user_response(7, PHONE, "Maryam Hosseini", "Secretary");
    row["is_active"] = json!(is_active);
    row["password_hash"] = json!(hash_password("secret1").unwrap());
    row
}

async fn mock_user_by_phone(server: &MockServer, row: Value) {
    Mock::given(method("GET"))
        .and(path("/rest/v1/users"))
        .and(query_param("phone_number", format!("eq.{}", PHONE)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([row])))
        .mount(server)
        .await;
}

fn setup(server: &MockServer) -> (TestClient, TestConfig) {
    let config = TestConfig::with_supabase_url(&server.uri());
    let client = TestClient::new(auth_routes(config.to_arc()), &config);
    (client, config)
}

#[tokio::test]
async fn login_returns_token_pair_for_valid_credentials() {
    let server = MockServer::start().await;
    mock_user_by_phone(&server, user_row(true)).await;
    let (client, config) = setup(&server);

    let response = client
        .send(None, "POST", "/login", Some(json!({ "phone_number": PHONE, "password": "secret1" })))
        .await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.json["token_type"], "bearer");
    assert_eq!(response.json["user"]["id"], 7);
    assert!(response.json["user"].get("password_hash").is_none());

    let access = response.json["access_token"].as_str().unwrap();
    let user = validate_token(access, &config.jwt_secret, TokenType::Access).unwrap();
    assert_eq!(user.id, 7);

    let refresh = response.json["refresh_token"].as_str().unwrap();
    assert!(validate_token(refresh, &config.jwt_secret, TokenType::Access).is_err());
    assert!(validate_token(refresh, &config.jwt_secret, TokenType::Refresh).is_ok());
}

#[tokio::test]
async fn wrong_password_is_unauthorized() {
    let server = MockServer::start().await;
    mock_user_by_phone(&server, user_row(true)).await;
    let (client, _) = setup(&server);

    let response = client
        .send(None, "POST", "/login", Some(json!({ "phone_number": PHONE, "password": "nope-nope" })))
        .await;

    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn unknown_phone_is_unauthorized() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/users"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;
    let (client, _) = setup(&server);

    let response = client
        .send(None, "POST", "/login", Some(json!({ "phone_number": "09999999999", "password": "secret1" })))
        .await;

    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn inactive_user_is_forbidden() {
    let server = MockServer::start().await;
    mock_user_by_phone(&server, user_row(false)).await;
    let (client, _) = setup(&server);

    let response = client
        .send(None, "POST", "/login", Some(json!({ "phone_number": PHONE, "password": "secret1" })))
        .await;

    assert_eq!(response.status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn refresh_issues_new_pair() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/users"))
        .and(query_param("id", "eq.7"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::user_response(7, PHONE, "Maryam Hosseini", "Secretary")
        ])))
        .mount(&server)
        .await;
    let (client, config) = setup(&server);

    let refresh = JwtTestUtils::create_refresh_token(&TestUser::secretary(7), &config.jwt_secret);
    let response = client
        .send(None, "POST", "/refresh", Some(json!({ "refresh_token": refresh })))
        .await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.json["user"]["full_name"], "Maryam Hosseini");
}

#[tokio::test]
async fn access_token_cannot_refresh() {
    let server = MockServer::start().await;
    let (client, config) = setup(&server);

    let access = JwtTestUtils::create_test_token(&TestUser::secretary(7), &config.jwt_secret, Some(1));
    let response = client
        .send(None, "POST", "/refresh", Some(json!({ "refresh_token": access })))
        .await;

    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn refresh_for_deleted_user_is_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/users"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;
    let (client, config) = setup(&server);

    let refresh = JwtTestUtils::create_refresh_token(&TestUser::patient(70), &config.jwt_secret);
    let response = client
        .send(None, "POST", "/refresh", Some(json!({ "refresh_token": refresh })))
        .await;

    assert_eq!(response.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn me_requires_valid_access_token() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/users"))
        .and(query_param("id", "eq.7"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::user_response(7, PHONE, "Maryam Hosseini", "Secretary")
        ])))
        .mount(&server)
        .await;
    let (client, config) = setup(&server);

    let ok = client.get(&TestUser::secretary(7), "/me").await;
    assert_eq!(ok.status, StatusCode::OK);
    assert_eq!(ok.json["role"], "Secretary");

    let anonymous = client.send(None, "GET", "/me", None).await;
    assert_eq!(anonymous.status, StatusCode::UNAUTHORIZED);

    let expired = JwtTestUtils::create_expired_token(&TestUser::secretary(7), &config.jwt_secret);
    let response = client.send_with_token(Some(&expired), "GET", "/me", None).await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);

    let refresh = JwtTestUtils::create_refresh_token(&TestUser::secretary(7), &config.jwt_secret);
    let response = client.send_with_token(Some(&refresh), "GET", "/me", None).await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
}
