use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::AppError;

#[derive(Debug, Serialize, Deserialize)]
pub struct JwtHeader {
    pub alg: String,
    pub typ: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    Access,
    Refresh,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtClaims {
    pub sub: String,
    pub role: UserRole,
    #[serde(rename = "type")]
    pub token_type: TokenType,
    pub exp: u64,
    pub iat: Option<u64>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum UserRole {
    #[serde(alias = "admin")]
    Admin,
    #[serde(alias = "secretary")]
    Secretary,
    #[serde(alias = "patient")]
    Patient,
}

impl Default for UserRole {
    fn default() -> Self {
        UserRole::Patient
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UserRole::Admin => write!(f, "Admin"),
            UserRole::Secretary => write!(f, "Secretary"),
            UserRole::Patient => write!(f, "Patient"),
        }
    }
}

impl FromStr for UserRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "admin" => Ok(UserRole::Admin),
            "secretary" => Ok(UserRole::Secretary),
            "patient" => Ok(UserRole::Patient),
            other => Err(format!("Unknown role: {}", other)),
        }
    }
}

/// Identity attached to a request by the auth middleware.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: i64,
    pub role: UserRole,
    pub issued_at: Option<DateTime<Utc>>,
}

impl AuthUser {
    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }

    /// Admins and secretaries run the front desk.
    pub fn is_staff(&self) -> bool {
        matches!(self.role, UserRole::Admin | UserRole::Secretary)
    }

    pub fn is_patient(&self) -> bool {
        self.role == UserRole::Patient
    }

    pub fn require_admin(&self) -> Result<(), AppError> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(AppError::Forbidden("Only administrators are allowed to do this".to_string()))
        }
    }

    pub fn require_staff(&self) -> Result<(), AppError> {
        if self.is_staff() {
            Ok(())
        } else {
            Err(AppError::Forbidden("Only secretaries and administrators are allowed to do this".to_string()))
        }
    }
}
