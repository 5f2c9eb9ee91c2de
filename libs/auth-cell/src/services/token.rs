use chrono::Duration;
use tracing::{debug, info, warn};

use shared_config::AppConfig;
use shared_models::auth::TokenType;
use shared_models::error::AppError;
use shared_utils::jwt::{issue_token, validate_token};
use shared_utils::password::verify_password;
use user_cell::models::{User, UserError};
use user_cell::UserService;

use crate::models::{LoginRequest, TokenResponse};

const INVALID_CREDENTIALS: &str = "Incorrect phone number or password";

pub struct AuthService<'a> {
    config: &'a AppConfig,
    users: UserService,
}

impl<'a> AuthService<'a> {
    pub fn new(config: &'a AppConfig) -> Self {
        Self {
            config,
            users: UserService::new(config),
        }
    }

    pub async fn login(&self, request: LoginRequest) -> Result<TokenResponse, AppError> {
        debug!("Login attempt for {}", request.phone_number);

        let credentials = self
            .users
            .find_credentials(&request.phone_number)
            .await?
            .ok_or_else(|| AppError::Auth(INVALID_CREDENTIALS.to_string()))?;

        let matches = verify_password(&request.password, &credentials.password_hash).unwrap_or_else(|e| {
            warn!("Stored password hash for user {} is unreadable: {}", credentials.user.id, e);
            false
        });
        if !matches {
            return Err(AppError::Auth(INVALID_CREDENTIALS.to_string()));
        }

        if !credentials.user.is_active {
            warn!("Inactive user {} tried to log in", credentials.user.id);
            return Err(AppError::Forbidden("User account is inactive".to_string()));
        }

        info!("User {} logged in", credentials.user.id);
        self.token_pair(credentials.user)
    }

    /// Exchanges a refresh token for a fresh pair. Role and activity are re-read from storage.
    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenResponse, AppError> {
        let claims = validate_token(refresh_token, &self.config.jwt_secret, TokenType::Refresh)
            .map_err(AppError::Auth)?;

        let user = match self.users.get_user(claims.id).await {
            Ok(user) if user.is_active => user,
            Ok(_) | Err(UserError::NotFound) => return Err(AppError::NotFound("User not found".to_string())),
            Err(e) => return Err(e.into()),
        };

        debug!("Refreshing tokens for user {}", user.id);
        self.token_pair(user)
    }

    pub async fn current_user(&self, user_id: i64) -> Result<User, AppError> {
        Ok(self.users.get_user(user_id).await?)
    }

    fn token_pair(&self, user: User) -> Result<TokenResponse, AppError> {
        let access_token = issue_token(
            user.id,
            user.role,
            TokenType::Access,
            Duration::minutes(self.config.access_token_expire_minutes),
            &self.config.jwt_secret,
        )
        .map_err(AppError::Internal)?;

        let refresh_token = issue_token(
            user.id,
            user.role,
            TokenType::Refresh,
            Duration::days(self.config.refresh_token_expire_days),
            &self.config.jwt_secret,
        )
        .map_err(AppError::Internal)?;

        Ok(TokenResponse {
            access_token,
            refresh_token,
            token_type: "bearer".to_string(),
            user,
        })
    }
}
