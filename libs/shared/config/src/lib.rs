use std::env;
use tracing::warn;

pub const DEFAULT_ACCESS_TOKEN_MINUTES: i64 = 30;
pub const DEFAULT_REFRESH_TOKEN_DAYS: i64 = 7;
pub const DEFAULT_SERVER_PORT: u16 = 8000;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub app_name: String,
    pub supabase_url: String,
    pub supabase_service_key: String,
    pub jwt_secret: String,
    pub access_token_expire_minutes: i64,
    pub refresh_token_expire_days: i64,
    pub cors_origins: Vec<String>,
    pub server_port: u16,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let config = Self {
            app_name: env::var("APP_NAME")
                .unwrap_or_else(|_| "Clinic Management System".to_string()),
            supabase_url: env::var("SUPABASE_URL")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_URL not set, using empty value");
                    String::new()
                }),
            supabase_service_key: env::var("SUPABASE_SERVICE_KEY")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_SERVICE_KEY not set, using empty value");
                    String::new()
                }),
            jwt_secret: env::var("JWT_SECRET")
                .unwrap_or_else(|_| {
                    warn!("JWT_SECRET not set, using empty value");
                    String::new()
                }),
            access_token_expire_minutes: parse_or("ACCESS_TOKEN_EXPIRE_MINUTES", DEFAULT_ACCESS_TOKEN_MINUTES),
            refresh_token_expire_days: parse_or("REFRESH_TOKEN_EXPIRE_DAYS", DEFAULT_REFRESH_TOKEN_DAYS),
            cors_origins: env::var("BACKEND_CORS_ORIGINS")
                .map(|raw| parse_origins(&raw))
                .unwrap_or_else(|_| default_cors_origins()),
            server_port: parse_or("SERVER_PORT", DEFAULT_SERVER_PORT),
        };

        if !config.is_configured() {
            warn!("Application not fully configured - missing environment variables");
        }

        config
    }

    pub fn is_configured(&self) -> bool {
        !self.supabase_url.is_empty()
            && !self.supabase_service_key.is_empty()
            && !self.jwt_secret.is_empty()
    }
}

fn parse_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    match env::var(key) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!("{} has an invalid value '{}', using default", key, raw);
            default
        }),
        Err(_) => default,
    }
}

pub fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|origin| origin.trim().trim_matches(|c| c == '"' || c == '[' || c == ']'))
        .filter(|origin| !origin.is_empty())
        .map(str::to_string)
        .collect()
}

pub fn default_cors_origins() -> Vec<String> {
    vec![
        "http://localhost:1212".to_string(),
        "http://localhost:8000".to_string(),
        "http://127.0.0.1:1212".to_string(),
        "http://127.0.0.1:8000".to_string(),
    ]
}
