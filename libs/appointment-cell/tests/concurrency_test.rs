use std::sync::{Arc, Mutex};

use chrono::{DateTime, TimeZone, Utc};
use futures::future::join_all;
use serde_json::{json, Value};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

use appointment_cell::models::{AppointmentError, AppointmentStatus, CreateAppointmentRequest};
use shared_models::pagination::Pagination;
use appointment_cell::services::AppointmentService;
use shared_utils::test_utils::{MockSupabaseResponses, TestConfig};

/// In-memory appointments table. Reads honour an `id=eq.` filter and otherwise
/// return every stored row; inserts append, deletes remove by id.
#[derive(Clone, Default)]
struct AppointmentTable {
    rows: Arc<Mutex<Vec<Value>>>,
    next_id: Arc<Mutex<i64>>,
}

fn id_filter(request: &Request) -> Option<i64> {
    request
        .url
        .query_pairs()
        .find(|(key, _)| key == "id")
        .and_then(|(_, value)| value.strip_prefix("eq.").and_then(|id| id.parse().ok()))
}

impl Respond for AppointmentTable {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let mut rows = self.rows.lock().unwrap();
        let id = id_filter(request);
        let selected = |row: &Value| id.map_or(true, |id| row["id"] == json!(id));

        match request.method.as_str() {
            "GET" => {
                let found: Vec<Value> = rows.iter().filter(|row| selected(*row)).cloned().collect();
                ResponseTemplate::new(200).set_body_json(Value::Array(found))
            }
            "POST" => {
                let body: Value = serde_json::from_slice(&request.body).unwrap();
                let mut row = body[0].clone();
                let mut next_id = self.next_id.lock().unwrap();
                *next_id += 1;
                row["id"] = json!(*next_id);
                rows.push(row.clone());
                ResponseTemplate::new(201).set_body_json(json!([row]))
            }
            "DELETE" => {
                let (removed, kept): (Vec<Value>, Vec<Value>) = rows.drain(..).partition(|row| selected(row));
                *rows = kept;
                ResponseTemplate::new(200).set_body_json(Value::Array(removed))
            }
            _ => ResponseTemplate::new(405),
        }
    }
}

async fn setup() -> (MockServer, AppointmentTable, AppointmentService) {
    let server = MockServer::start().await;
    let table = AppointmentTable::default();

    Mock::given(method("GET"))
        .and(path("/rest/v1/patients"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::patient_response(4, 20, "Sara Ahmadi")
        ])))
        .mount(&server)
        .await;

    Mock::given(path("/rest/v1/appointments"))
        .respond_with(table.clone())
        .mount(&server)
        .await;

    let service = AppointmentService::new(&TestConfig::with_supabase_url(&server.uri()).to_app_config());
    (server, table, service)
}

fn request_at(date: DateTime<Utc>) -> CreateAppointmentRequest {
    CreateAppointmentRequest {
        patient_id: 4,
        appointment_date: date,
        reason: None,
        notes: None,
    }
}

#[tokio::test]
async fn concurrent_requests_for_one_slot_book_it_once() {
    let (_server, table, service) = setup().await;
    let date = Utc.with_ymd_and_hms(2024, 1, 10, 10, 0, 0).unwrap();

    let results = join_all((0..8).map(|_| service.schedule(request_at(date)))).await;

    let booked = results.iter().filter(|r| r.is_ok()).count();
    let conflicts = results
        .iter()
        .filter(|r| matches!(r, Err(AppointmentError::Conflict { .. })))
        .count();

    assert_eq!(booked, 1);
    assert_eq!(conflicts, 7);
    assert_eq!(table.rows.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn sequential_bookings_keep_thirty_minute_spacing() {
    let (_server, table, service) = setup().await;
    let base = Utc.with_ymd_and_hms(2024, 1, 10, 9, 0, 0).unwrap();

    let offsets = [0, 10, 30, 45, 60, 89, 90];
    for minutes in offsets {
        let _ = service.schedule(request_at(base + chrono::Duration::minutes(minutes))).await;
    }

    let mut dates: Vec<DateTime<Utc>> = table
        .rows
        .lock()
        .unwrap()
        .iter()
        .map(|row| serde_json::from_value(row["appointment_date"].clone()).unwrap())
        .collect();
    dates.sort();

    assert_eq!(dates.len(), 4);
    for pair in dates.windows(2) {
        assert!(pair[1] - pair[0] >= chrono::Duration::minutes(30));
    }
}

#[tokio::test]
async fn deleted_appointment_leaves_the_list_and_cannot_be_deleted_again() {
    let (_server, _table, service) = setup().await;
    let date = Utc.with_ymd_and_hms(2024, 1, 10, 10, 0, 0).unwrap();

    let kept = service.schedule(request_at(date)).await.unwrap();
    let removed = service
        .schedule(request_at(date + chrono::Duration::hours(2)))
        .await
        .unwrap();
    assert_eq!(service.list(None, Pagination::default()).await.unwrap().len(), 2);

    service.delete(removed.id).await.unwrap();

    let remaining = service.list(None, Pagination::default()).await.unwrap();
    assert_eq!(remaining.iter().map(|a| a.id).collect::<Vec<_>>(), vec![kept.id]);
    assert!(matches!(service.get(removed.id).await, Err(AppointmentError::NotFound)));
    assert!(matches!(service.delete(removed.id).await, Err(AppointmentError::NotFound)));

    // the freed slot can be booked again
    let rebooked = service
        .schedule(request_at(date + chrono::Duration::hours(2)))
        .await
        .unwrap();
    assert_eq!(rebooked.status, AppointmentStatus::Pending);
}
