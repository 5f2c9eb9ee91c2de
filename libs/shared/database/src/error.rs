use serde::Deserialize;
use thiserror::Error;

use shared_models::error::AppError;

/// PostgreSQL SQLSTATE for a unique constraint violation.
pub const UNIQUE_VIOLATION: &str = "23505";
/// PostgreSQL SQLSTATE for an exclusion constraint violation.
pub const EXCLUSION_VIOLATION: &str = "23P01";
/// PostgreSQL SQLSTATE for a foreign key violation.
pub const FOREIGN_KEY_VIOLATION: &str = "23503";

#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Constraint violation: {message}")]
    Conflict { code: Option<String>, message: String },

    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Storage returned no rows for {0}")]
    EmptyResult(String),
}

impl DatabaseError {
    pub fn is_unique_violation(&self) -> bool {
        matches!(self, DatabaseError::Conflict { code: Some(code), .. } if code == UNIQUE_VIOLATION)
    }

    pub fn is_exclusion_violation(&self) -> bool {
        matches!(self, DatabaseError::Conflict { code: Some(code), .. } if code == EXCLUSION_VIOLATION)
    }

    pub fn is_foreign_key_violation(&self) -> bool {
        matches!(self, DatabaseError::Conflict { code: Some(code), .. } if code == FOREIGN_KEY_VIOLATION)
    }
}

/// Error body returned by PostgREST.
#[derive(Debug, Default, Deserialize)]
pub struct PostgrestErrorBody {
    pub code: Option<String>,
    pub message: Option<String>,
    pub details: Option<String>,
    pub hint: Option<String>,
}

impl PostgrestErrorBody {
    pub fn parse(raw: &str) -> Self {
        serde_json::from_str(raw).unwrap_or_else(|_| Self {
            message: Some(raw.to_string()),
            ..Self::default()
        })
    }

    pub fn describe(&self) -> String {
        match (&self.message, &self.details) {
            (Some(message), Some(details)) => format!("{} ({})", message, details),
            (Some(message), None) => message.clone(),
            (None, Some(details)) => details.clone(),
            (None, None) => "unknown error".to_string(),
        }
    }
}

impl From<DatabaseError> for AppError {
    fn from(err: DatabaseError) -> Self {
        match err {
            DatabaseError::NotFound(msg) => AppError::NotFound(msg),
            DatabaseError::Conflict { message, .. } => AppError::Conflict(message),
            DatabaseError::Auth(msg) => AppError::ExternalService(format!("Storage rejected credentials: {}", msg)),
            other => AppError::Database(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_postgrest_error_body() {
        let body = PostgrestErrorBody::parse(
            r#"{"code":"23505","message":"duplicate key value","details":"Key (phone_number)=(09120000000) already exists.","hint":null}"#,
        );
        assert_eq!(body.code.as_deref(), Some(UNIQUE_VIOLATION));
        assert!(body.describe().starts_with("duplicate key value"));
    }

    #[test]
    fn falls_back_to_raw_text() {
        let body = PostgrestErrorBody::parse("gateway timeout");
        assert_eq!(body.code, None);
        assert_eq!(body.describe(), "gateway timeout");
    }

    #[test]
    fn conflict_maps_to_app_conflict() {
        let err = DatabaseError::Conflict {
            code: Some(EXCLUSION_VIOLATION.to_string()),
            message: "overlap".to_string(),
        };
        assert!(err.is_exclusion_violation());
        assert!(matches!(AppError::from(err), AppError::Conflict(_)));
    }
}
