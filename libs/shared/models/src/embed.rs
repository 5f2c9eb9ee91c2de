//! Shapes of rows embedded by PostgREST resource embedding.

use serde::{Deserialize, Serialize};

/// Embeds the owning user into a patient row.
pub const USER_EMBED: &str = "user:users(full_name,phone_number)";

/// Embeds a row's patient together with that patient's user.
pub const PATIENT_EMBED: &str = "patient:patients(user:users(full_name,phone_number))";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EmbeddedUser {
    pub full_name: String,
    pub phone_number: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EmbeddedPatient {
    #[serde(default)]
    pub user: Option<EmbeddedUser>,
}

impl EmbeddedPatient {
    pub fn full_name(&self) -> Option<String> {
        self.user.as_ref().map(|u| u.full_name.clone())
    }

    pub fn phone_number(&self) -> Option<String> {
        self.user.as_ref().map(|u| u.phone_number.clone())
    }
}
