//! Fixtures shared by the cell test suites.

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Extension, Router,
};
use chrono::{Duration, Utc};
use serde_json::{json, Value};
use tower::ServiceExt;

use shared_config::AppConfig;
use shared_models::auth::{AuthUser, TokenType, UserRole};

use crate::jwt::issue_token;

pub struct TestConfig {
    pub jwt_secret: String,
    pub supabase_url: String,
    pub supabase_service_key: String,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            jwt_secret: "test-secret-key-for-jwt-validation-must-be-long-enough".to_string(),
            supabase_url: "http://localhost:54321".to_string(),
            supabase_service_key: "test-service-key".to_string(),
        }
    }
}

impl TestConfig {
    /// Points storage at a mock server.
    pub fn with_supabase_url(url: &str) -> Self {
        Self {
            supabase_url: url.to_string(),
            ..Self::default()
        }
    }

    pub fn to_app_config(&self) -> AppConfig {
        AppConfig {
            app_name: "Clinic Management System".to_string(),
            supabase_url: self.supabase_url.clone(),
            supabase_service_key: self.supabase_service_key.clone(),
            jwt_secret: self.jwt_secret.clone(),
            access_token_expire_minutes: 30,
            refresh_token_expire_days: 7,
            cors_origins: vec!["http://localhost:1212".to_string()],
            server_port: 8000,
        }
    }

    pub fn to_arc(&self) -> Arc<AppConfig> {
        Arc::new(self.to_app_config())
    }
}

pub struct TestUser {
    pub id: i64,
    pub role: UserRole,
}

impl TestUser {
    pub fn new(id: i64, role: UserRole) -> Self {
        Self { id, role }
    }

    pub fn admin(id: i64) -> Self {
        Self::new(id, UserRole::Admin)
    }

    pub fn secretary(id: i64) -> Self {
        Self::new(id, UserRole::Secretary)
    }

    pub fn patient(id: i64) -> Self {
        Self::new(id, UserRole::Patient)
    }

    pub fn to_auth_user(&self) -> AuthUser {
        AuthUser {
            id: self.id,
            role: self.role,
            issued_at: Some(Utc::now()),
        }
    }

    pub fn extension(&self) -> Extension<AuthUser> {
        Extension(self.to_auth_user())
    }
}

pub struct JwtTestUtils;

impl JwtTestUtils {
    pub fn create_test_token(user: &TestUser, secret: &str, exp_hours: Option<i64>) -> String {
        issue_token(
            user.id,
            user.role,
            TokenType::Access,
            Duration::hours(exp_hours.unwrap_or(24)),
            secret,
        )
        .unwrap_or_default()
    }

    pub fn create_refresh_token(user: &TestUser, secret: &str) -> String {
        issue_token(user.id, user.role, TokenType::Refresh, Duration::days(7), secret).unwrap_or_default()
    }

    pub fn create_expired_token(user: &TestUser, secret: &str) -> String {
        Self::create_test_token(user, secret, Some(-1))
    }

    pub fn create_invalid_signature_token(user: &TestUser) -> String {
        Self::create_test_token(user, "wrong-secret", Some(24))
    }

    pub fn create_malformed_token() -> String {
        "invalid.token.format".to_string()
    }
}

/// Drives a router in-process with bearer tokens signed by the test secret.
pub struct TestClient {
    router: Router,
    jwt_secret: String,
}

/// Status, raw body and body parsed as JSON (`Null` when empty or not JSON).
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: axum::http::HeaderMap,
    pub text: String,
    pub json: Value,
}

impl TestClient {
    pub fn new(router: Router, config: &TestConfig) -> Self {
        Self {
            router,
            jwt_secret: config.jwt_secret.clone(),
        }
    }

    pub async fn send(&self, user: Option<&TestUser>, method: &str, uri: &str, body: Option<Value>) -> TestResponse {
        let token = user.map(|user| JwtTestUtils::create_test_token(user, &self.jwt_secret, Some(1)));
        self.send_with_token(token.as_deref(), method, uri, body).await
    }

    pub async fn send_with_token(
        &self,
        token: Option<&str>,
        method: &str,
        uri: &str,
        body: Option<Value>,
    ) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header("Authorization", format!("Bearer {}", token));
        }

        let request = match body {
            Some(body) => builder
                .header("Content-Type", "application/json")
                .body(Body::from(body.to_string())),
            None => builder.body(Body::empty()),
        };

        let response = match request {
            Ok(request) => self.router.clone().oneshot(request).await,
            Err(e) => panic!("invalid test request: {}", e),
        };
        let response = match response {
            Ok(response) => response,
            Err(never) => match never {},
        };

        let status = response.status();
        let headers = response.headers().clone();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap_or_default();
        let text = String::from_utf8_lossy(&bytes).into_owned();
        let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);

        TestResponse { status, headers, text, json }
    }

    pub async fn get(&self, user: &TestUser, uri: &str) -> TestResponse {
        self.send(Some(user), "GET", uri, None).await
    }

    pub async fn post(&self, user: &TestUser, uri: &str, body: Value) -> TestResponse {
        self.send(Some(user), "POST", uri, Some(body)).await
    }

    pub async fn put(&self, user: &TestUser, uri: &str, body: Value) -> TestResponse {
        self.send(Some(user), "PUT", uri, Some(body)).await
    }

    pub async fn delete(&self, user: &TestUser, uri: &str) -> TestResponse {
        self.send(Some(user), "DELETE", uri, None).await
    }
}

/// Rows shaped the way PostgREST returns them.
pub struct MockSupabaseResponses;

impl MockSupabaseResponses {
    pub fn user_response(id: i64, phone_number: &str, full_name: &str, role: &str) -> Value {
        json!({
            "id": id,
            "phone_number": phone_number,
            "full_name": full_name,
            "role": role,
            "is_active": true,
            "created_at": "2024-01-01T00:00:00Z",
            "updated_at": null
        })
    }

    pub fn patient_response(id: i64, user_id: i64, full_name: &str) -> Value {
        json!({
            "id": id,
            "user_id": user_id,
            "national_code": "0012345678",
            "date_of_birth": "1990-05-17",
            "gender": "Female",
            "blood_type": "O+",
            "address": "12 Valiasr St",
            "emergency_contact": "02112345678",
            "medical_history": null,
            "created_at": "2024-01-01T00:00:00Z",
            "updated_at": null,
            "user": { "full_name": full_name, "phone_number": "09120000000" }
        })
    }

    pub fn appointment_response(id: i64, patient_id: i64, appointment_date: &str, status: &str) -> Value {
        json!({
            "id": id,
            "patient_id": patient_id,
            "appointment_date": appointment_date,
            "status": status,
            "reason": "Checkup",
            "notes": null,
            "created_at": "2024-01-01T00:00:00Z",
            "updated_at": "2024-01-01T00:00:00Z",
            "patient": { "user": { "full_name": "Sara Ahmadi", "phone_number": "09120000000" } }
        })
    }

    pub fn medication_response(id: i64, name: &str) -> Value {
        json!({
            "id": id,
            "name": name,
            "generic_name": null,
            "manufacturer": "Darou Pakhsh",
            "dosage_form": "Tablet",
            "strength": "500mg",
            "unit_price": 12.5,
            "stock_quantity": 40,
            "description": null,
            "created_at": "2024-01-01T00:00:00Z",
            "updated_at": null
        })
    }

    pub fn factor_response(id: i64, patient_id: i64, units: i64) -> Value {
        json!({
            "id": id,
            "patient_id": patient_id,
            "factor_type": "Factor VIII",
            "units_administered": units,
            "administration_date": "2024-03-01T09:00:00Z",
            "lot_number": "LOT-1",
            "administered_by": "Nurse Karimi",
            "notes": null,
            "cost": 150.0,
            "created_at": "2024-03-01T09:00:00Z",
            "updated_at": null,
            "patient": { "user": { "full_name": "Sara Ahmadi", "phone_number": "09120000000" } }
        })
    }

    pub fn error_response(message: &str, code: &str) -> Value {
        json!({
            "code": code,
            "message": message,
            "details": null,
            "hint": null
        })
    }
}
