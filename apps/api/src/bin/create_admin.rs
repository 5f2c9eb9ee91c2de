//! Creates the first administrator from `ADMIN_PHONE`, `ADMIN_PASSWORD` and
//! `ADMIN_FULL_NAME`. Does nothing when the phone number is already registered.

use std::env;

use anyhow::{bail, Context};
use dotenv::dotenv;
use tracing::info;
use tracing_subscriber::EnvFilter;

use shared_config::AppConfig;
use shared_models::auth::UserRole;
use user_cell::{CreateUserRequest, UserService};

const DEFAULT_FULL_NAME: &str = "System Administrator";

fn required(key: &str) -> anyhow::Result<String> {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .with_context(|| format!("{} must be set", key))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = AppConfig::from_env();
    if !config.is_configured() {
        bail!("SUPABASE_URL, SUPABASE_SERVICE_KEY and JWT_SECRET must be set");
    }

    let phone_number = required("ADMIN_PHONE")?;
    let password = required("ADMIN_PASSWORD")?;
    let full_name = env::var("ADMIN_FULL_NAME").unwrap_or_else(|_| DEFAULT_FULL_NAME.to_string());

    let users = UserService::new(&config);
    if users.phone_registered(&phone_number).await? {
        info!("A user with phone {} already exists, nothing to do", phone_number);
        return Ok(());
    }

    let admin = users
        .create_user(CreateUserRequest {
            phone_number,
            full_name,
            password,
            role: UserRole::Admin,
        })
        .await?;

    info!("Administrator {} created with id {}", admin.full_name, admin.id);
    Ok(())
}
