use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;
use wiremock::matchers::{body_partial_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use appointment_cell::appointment_routes;
use appointment_cell::models::AppointmentStatus;
use shared_utils::test_utils::{JwtTestUtils, MockSupabaseResponses, TestConfig, TestUser};

struct TestApp {
    router: Router,
    config: TestConfig,
}

impl TestApp {
    fn new(server: &MockServer) -> Self {
        let config = TestConfig::with_supabase_url(&server.uri());
        let router = appointment_routes(config.to_arc());
        Self { router, config }
    }

    fn token_for(&self, user: &TestUser) -> String {
        JwtTestUtils::create_test_token(user, &self.config.jwt_secret, Some(1))
    }

    async fn send(&self, user: Option<&TestUser>, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(user) = user {
            builder = builder.header("Authorization", format!("Bearer {}", self.token_for(user)));
        }
        let request = match body {
            Some(body) => builder
                .header("Content-Type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }
}

async fn mock_patient_exists(server: &MockServer, patient_id: i64, exists: bool) {
    let body = if exists { json!([{ "id": patient_id }]) } else { json!([]) };
    Mock::given(method("GET"))
        .and(path("/rest/v1/patients"))
        .and(query_param("id", format!("eq.{}", patient_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

async fn mock_conflict_candidates(server: &MockServer, candidates: Value) {
    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("select", "id,appointment_date,status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(candidates))
        .mount(server)
        .await;
}

async fn mock_insert(server: &MockServer, appointment_date: &str) {
    Mock::given(method("POST"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([
            MockSupabaseResponses::appointment_response(11, 4, appointment_date, "Pending")
        ])))
        .mount(server)
        .await;
}

fn schedule_body(date: &str) -> Value {
    json!({ "patient_id": 4, "appointment_date": date, "reason": "Checkup" })
}

#[tokio::test]
async fn secretary_schedules_free_slot() {
    let server = MockServer::start().await;
    mock_patient_exists(&server, 4, true).await;
    mock_conflict_candidates(&server, json!([])).await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/appointments"))
        .and(body_partial_json(json!([{ "patient_id": 4, "status": "Pending" }])))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([
            MockSupabaseResponses::appointment_response(11, 4, "2024-01-10T10:00:00Z", "Pending")
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let app = TestApp::new(&server);
    let (status, body) = app
        .send(Some(&TestUser::secretary(2)), "POST", "/", Some(schedule_body("2024-01-10T10:00:00")))
        .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["id"], 11);
    assert_eq!(body["status"], "Pending");
}

#[tokio::test]
async fn twenty_minutes_after_pending_is_a_conflict() {
    let server = MockServer::start().await;
    mock_patient_exists(&server, 4, true).await;
    mock_conflict_candidates(
        &server,
        json!([{ "id": 1, "appointment_date": "2024-01-10T10:00:00Z", "status": "Pending" }]),
    )
    .await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&server)
        .await;

    let app = TestApp::new(&server);
    let (status, body) = app
        .send(Some(&TestUser::admin(1)), "POST", "/", Some(schedule_body("2024-01-10T10:20:00")))
        .await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["error"].as_str().unwrap().contains("2024-01-10T10:00:00Z"));
}

#[tokio::test]
async fn exactly_thirty_minutes_later_is_accepted() {
    let server = MockServer::start().await;
    mock_patient_exists(&server, 4, true).await;
    // Even if storage hands back the boundary neighbour, it is not a conflict.
    mock_conflict_candidates(
        &server,
        json!([{ "id": 1, "appointment_date": "2024-01-10T10:00:00Z", "status": "Pending" }]),
    )
    .await;
    mock_insert(&server, "2024-01-10T10:30:00Z").await;

    let app = TestApp::new(&server);
    let (status, _) = app
        .send(Some(&TestUser::secretary(2)), "POST", "/", Some(schedule_body("2024-01-10T10:30:00")))
        .await;

    assert_eq!(status, StatusCode::CREATED);
}

#[tokio::test]
async fn canceled_neighbour_does_not_block() {
    let server = MockServer::start().await;
    mock_patient_exists(&server, 4, true).await;
    mock_conflict_candidates(
        &server,
        json!([{ "id": 1, "appointment_date": "2024-01-10T10:00:00Z", "status": "Canceled" }]),
    )
    .await;
    mock_insert(&server, "2024-01-10T10:10:00Z").await;

    let app = TestApp::new(&server);
    let (status, _) = app
        .send(Some(&TestUser::secretary(2)), "POST", "/", Some(schedule_body("2024-01-10T10:10:00")))
        .await;

    assert_eq!(status, StatusCode::CREATED);
}

#[tokio::test]
async fn unknown_patient_creates_nothing() {
    let server = MockServer::start().await;
    mock_patient_exists(&server, 4, false).await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&server)
        .await;

    let app = TestApp::new(&server);
    let (status, body) = app
        .send(Some(&TestUser::secretary(2)), "POST", "/", Some(schedule_body("2024-01-10T10:00:00")))
        .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Patient not found");
}

#[tokio::test]
async fn storage_exclusion_violation_is_a_conflict() {
    let server = MockServer::start().await;
    mock_patient_exists(&server, 4, true).await;
    mock_conflict_candidates(&server, json!([])).await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(409).set_body_json(MockSupabaseResponses::error_response(
            "conflicting key value violates exclusion constraint \"appointments_no_overlap\"",
            "23P01",
        )))
        .mount(&server)
        .await;

    let app = TestApp::new(&server);
    let (status, _) = app
        .send(Some(&TestUser::secretary(2)), "POST", "/", Some(schedule_body("2024-01-10T10:00:00")))
        .await;

    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn patients_cannot_schedule_and_anonymous_is_rejected() {
    let server = MockServer::start().await;
    let app = TestApp::new(&server);

    let (status, _) = app
        .send(Some(&TestUser::patient(9)), "POST", "/", Some(schedule_body("2024-01-10T10:00:00")))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app.send(None, "GET", "/", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn list_filters_by_status_newest_first() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("status", "eq.Confirmed"))
        .and(query_param("order", "appointment_date.desc"))
        .and(query_param("offset", "5"))
        .and(query_param("limit", "10"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::appointment_response(3, 4, "2024-02-01T09:00:00Z", "Confirmed"),
            MockSupabaseResponses::appointment_response(2, 4, "2024-01-20T09:00:00Z", "Confirmed"),
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let app = TestApp::new(&server);
    let (status, body) = app
        .send(
            Some(&TestUser::secretary(2)),
            "GET",
            "/?status_filter=Confirmed&skip=5&limit=10",
            None,
        )
        .await;

    assert_eq!(status, StatusCode::OK);
    let items = body.as_array().unwrap();
    assert_eq!(items.len(), 2);
    assert_eq!(items[0]["id"], 3);
    assert_eq!(items[0]["patient_name"], "Sara Ahmadi");
    assert_eq!(items[0]["patient_phone"], "09120000000");
}

#[tokio::test]
async fn status_update_on_unknown_appointment_is_not_found() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("id", "eq.99"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let app = TestApp::new(&server);
    let (status, _) = app
        .send(
            Some(&TestUser::secretary(2)),
            "PATCH",
            "/99/status",
            Some(json!({ "status": "Confirmed" })),
        )
        .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn every_status_transition_succeeds_when_no_neighbour_holds_the_slot() {
    // no active appointment within 30 minutes, so reactivation passes its check
    for from in AppointmentStatus::ALL {
        for to in AppointmentStatus::ALL {
            let server = MockServer::start().await;

            Mock::given(method("GET"))
                .and(path("/rest/v1/appointments"))
                .and(query_param("id", "eq.5"))
                .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                    MockSupabaseResponses::appointment_response(5, 4, "2024-01-10T10:00:00Z", from.as_str())
                ])))
                .mount(&server)
                .await;
            mock_conflict_candidates(&server, json!([])).await;

            let mut updated = MockSupabaseResponses::appointment_response(5, 4, "2024-01-10T10:00:00Z", to.as_str());
            updated["updated_at"] = json!("2024-01-11T08:00:00Z");
            Mock::given(method("PATCH"))
                .and(path("/rest/v1/appointments"))
                .and(query_param("id", "eq.5"))
                .and(body_partial_json(json!({ "status": to.as_str() })))
                .respond_with(ResponseTemplate::new(200).set_body_json(json!([updated])))
                .expect(1)
                .mount(&server)
                .await;

            let app = TestApp::new(&server);
            let (status, body) = app
                .send(
                    Some(&TestUser::admin(1)),
                    "PATCH",
                    "/5/status",
                    Some(json!({ "status": to.as_str() })),
                )
                .await;

            assert_eq!(status, StatusCode::OK, "{} -> {}", from, to);
            assert_eq!(body["status"], to.as_str());
            assert_eq!(body["updated_at"], "2024-01-11T08:00:00Z");
        }
    }
}

#[tokio::test]
async fn reactivating_into_an_occupied_slot_is_a_conflict() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("id", "eq.5"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::appointment_response(5, 4, "2024-01-10T10:00:00Z", "Canceled")
        ])))
        .mount(&server)
        .await;
    mock_conflict_candidates(
        &server,
        json!([{ "id": 8, "appointment_date": "2024-01-10T10:15:00Z", "status": "Confirmed" }]),
    )
    .await;

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let app = TestApp::new(&server);
    let (status, _) = app
        .send(Some(&TestUser::admin(1)), "PUT", "/5", Some(json!({ "status": "Pending" })))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, body) = app
        .send(Some(&TestUser::admin(1)), "PATCH", "/5/status", Some(json!({ "status": "Confirmed" })))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "Another appointment is already scheduled at 2024-01-10T10:15:00Z");
}

#[tokio::test]
async fn delete_then_repeat_delete_is_not_found() {
    let server = MockServer::start().await;

    Mock::given(method("DELETE"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("id", "eq.5"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::appointment_response(5, 4, "2024-01-10T10:00:00Z", "Pending")
        ])))
        .up_to_n_times(1)
        .mount(&server)
        .await;

    Mock::given(method("DELETE"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("id", "eq.5"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let app = TestApp::new(&server);
    let (first, _) = app.send(Some(&TestUser::secretary(2)), "DELETE", "/5", None).await;
    let (second, _) = app.send(Some(&TestUser::secretary(2)), "DELETE", "/5", None).await;

    assert_eq!(first, StatusCode::NO_CONTENT);
    assert_eq!(second, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn my_appointments_without_patient_record_is_not_found() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/patients"))
        .and(query_param("user_id", "eq.9"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let app = TestApp::new(&server);
    let (status, _) = app.send(Some(&TestUser::patient(9)), "GET", "/my", None).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn my_appointments_lists_the_callers_visits() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/patients"))
        .and(query_param("user_id", "eq.9"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{ "id": 4 }])))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("patient_id", "eq.4"))
        .and(query_param("offset", "5"))
        .and(query_param("limit", "10"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::appointment_response(3, 4, "2024-02-01T09:00:00Z", "Pending")
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let app = TestApp::new(&server);
    let (status, body) = app.send(Some(&TestUser::patient(9)), "GET", "/my?skip=5&limit=10", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);
    assert_eq!(body[0]["patient_id"], 4);
}
