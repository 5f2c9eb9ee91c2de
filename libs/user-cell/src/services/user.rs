use chrono::Utc;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use shared_config::AppConfig;
use shared_database::{supabase::encode_value, DatabaseError, SupabaseClient};
use shared_models::pagination::Pagination;
use shared_utils::password::hash_password;

use crate::models::{CreateUserRequest, UpdateUserRequest, User, UserCredentials, UserError};

const TABLE: &str = "users";
const PUBLIC_COLUMNS: &str = "id,phone_number,full_name,role,is_active,created_at,updated_at";

pub struct UserService {
    supabase: SupabaseClient,
}

impl UserService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    pub async fn create_user(&self, request: CreateUserRequest) -> Result<User, UserError> {
        request.validate()?;
        debug!("Creating {} user {}", request.role, request.phone_number);

        if self.phone_registered(&request.phone_number).await? {
            warn!("Phone number {} is already registered", request.phone_number);
            return Err(UserError::PhoneTaken);
        }

        let password_hash = hash_password(&request.password).map_err(|e| UserError::PasswordHash(e.to_string()))?;

        let row = json!({
            "phone_number": request.phone_number,
            "password_hash": password_hash,
            "full_name": request.full_name.trim(),
            "role": request.role,
            "is_active": true,
            "created_at": Utc::now(),
        });

        let created: UserCredentials = self.supabase.insert(TABLE, row).await.map_err(phone_taken_or)?;
        info!("User {} created with role {}", created.user.id, created.user.role);
        Ok(created.user)
    }

    pub async fn list_users(&self, pagination: Pagination) -> Result<Vec<User>, UserError> {
        let query = format!("select={}&order=id.asc&{}", PUBLIC_COLUMNS, pagination.to_query());
        Ok(self.supabase.select(TABLE, &query).await?)
    }

    pub async fn get_user(&self, user_id: i64) -> Result<User, UserError> {
        let query = format!("select={}&id=eq.{}", PUBLIC_COLUMNS, user_id);
        self.supabase
            .select_one(TABLE, &query)
            .await?
            .ok_or(UserError::NotFound)
    }

    /// Full row including the password hash; `None` when the phone is unknown.
    pub async fn find_credentials(&self, phone_number: &str) -> Result<Option<UserCredentials>, UserError> {
        let query = format!("phone_number=eq.{}", encode_value(phone_number));
        Ok(self.supabase.select_one(TABLE, &query).await?)
    }

    pub async fn phone_registered(&self, phone_number: &str) -> Result<bool, UserError> {
        let filter = format!("phone_number=eq.{}", encode_value(phone_number));
        Ok(self.supabase.exists(TABLE, &filter).await?)
    }

    pub async fn update_user(&self, user_id: i64, mut request: UpdateUserRequest) -> Result<User, UserError> {
        request.validate()?;

        let password_hash = match request.password.take() {
            Some(password) => Some(hash_password(&password).map_err(|e| UserError::PasswordHash(e.to_string()))?),
            None => None,
        };

        let patch = request.into_patch(password_hash, Utc::now());
        let filter = format!("id=eq.{}&select={}", user_id, PUBLIC_COLUMNS);

        let updated: Vec<User> = self
            .supabase
            .update(TABLE, &filter, Value::Object(patch))
            .await
            .map_err(phone_taken_or)?;

        let user = updated.into_iter().next().ok_or(UserError::NotFound)?;
        info!("User {} updated", user.id);
        Ok(user)
    }

    pub async fn delete_user(&self, user_id: i64) -> Result<(), UserError> {
        let removed = self.supabase.delete(TABLE, &format!("id=eq.{}", user_id)).await?;
        if removed == 0 {
            return Err(UserError::NotFound);
        }
        info!("User {} deleted", user_id);
        Ok(())
    }
}

fn phone_taken_or(err: DatabaseError) -> UserError {
    if err.is_unique_violation() {
        UserError::PhoneTaken
    } else {
        err.into()
    }
}
