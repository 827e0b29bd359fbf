//! API server configuration.

use khata_core::auth::jwt::TokenSecrets;
use khata_core::auth::session::{
    DEFAULT_ACCESS_TTL_MINUTES, DEFAULT_EMAIL_CONFIRMATION_MINUTES, DEFAULT_REFRESH_TTL_MINUTES,
    SessionSettings,
};
use tracing::warn;
use url::Url;

/// Default HTTP listen address.
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8000";
/// Default PostgreSQL URL.
pub const DEFAULT_DATABASE_URL: &str = "postgres://localhost:5432/khata";
/// Default path every route is nested under.
pub const DEFAULT_API_PREFIX: &str = "/api/v1";

/// Configuration for the API server.
#[derive(Clone, Debug)]
pub struct ApiConfig {
    /// Address to bind the HTTP listener (e.g. "127.0.0.1:8000").
    pub bind_addr: String,
    /// PostgreSQL connection URL, database name already applied.
    pub database_url: String,
    /// Route prefix such as `/api/v1`. Empty mounts at the root.
    pub api_prefix: String,
    /// Token signing secrets.
    pub secrets: TokenSecrets,
    /// Token and cookie lifetimes.
    pub session: SessionSettings,
}

impl ApiConfig {
    /// Reads configuration from environment variables with sensible defaults.
    ///
    /// | Variable                             | Default                            |
    /// |--------------------------------------|------------------------------------|
    /// | `BIND_ADDR`                          | `127.0.0.1:8000`                   |
    /// | `DATABASE_URL`                       | `postgres://localhost:5432/khata`  |
    /// | `DATABASE_NAME`                      | unset (keeps the URL's database)   |
    /// | `API_PREFIX`                         | `/api/v1`                          |
    /// | `ACCESS_TOKEN_SECRET`                | generated & persisted to file      |
    /// | `REFRESH_TOKEN_SECRET`               | generated & persisted to file      |
    /// | `FORGOT_PASSWORD_TOKEN_SECRET`       | generated & persisted to file      |
    /// | `ACCESS_TOKEN_EXPIRE_MINUTES`        | `30`                               |
    /// | `REFRESH_TOKEN_EXPIRE_MINUTES`       | `43200`                            |
    /// | `EMAIL_CONFIRMATION_EXPIRE_MINUTES`  | `10`                               |
    pub fn from_env() -> Self {
        let database_url = apply_database_name(
            std::env::var("DATABASE_URL").unwrap_or_else(|_| DEFAULT_DATABASE_URL.into()),
        );
        Self {
            bind_addr: std::env::var("BIND_ADDR").unwrap_or_else(|_| DEFAULT_BIND_ADDR.into()),
            database_url,
            api_prefix: normalize_prefix(
                &std::env::var("API_PREFIX").unwrap_or_else(|_| DEFAULT_API_PREFIX.into()),
            ),
            secrets: TokenSecrets::resolve(),
            session: SessionSettings {
                access_ttl_minutes: minutes_from_env(
                    "ACCESS_TOKEN_EXPIRE_MINUTES",
                    DEFAULT_ACCESS_TTL_MINUTES,
                ),
                refresh_ttl_minutes: minutes_from_env(
                    "REFRESH_TOKEN_EXPIRE_MINUTES",
                    DEFAULT_REFRESH_TTL_MINUTES,
                ),
                email_confirmation_minutes: minutes_from_env(
                    "EMAIL_CONFIRMATION_EXPIRE_MINUTES",
                    DEFAULT_EMAIL_CONFIRMATION_MINUTES,
                ),
            },
        }
    }
}

fn minutes_from_env(key: &str, default: i64) -> i64 {
    match std::env::var(key) {
        Ok(raw) => parse_minutes(key, &raw, default),
        Err(_) => default,
    }
}

fn parse_minutes(key: &str, raw: &str, default: i64) -> i64 {
    match raw.trim().parse::<i64>() {
        Ok(v) if v > 0 => v,
        _ => {
            warn!(key, raw, default, "ignoring invalid minutes value");
            default
        }
    }
}

/// Apply `DATABASE_NAME`, when set, to `database_url`.
pub fn apply_database_name(database_url: String) -> String {
    match std::env::var("DATABASE_NAME") {
        Ok(name) if !name.is_empty() => with_database_name(&database_url, &name),
        _ => database_url,
    }
}

/// Replace the database segment of a connection URL.
///
/// Unparseable URLs are returned unchanged; the connect step reports them.
pub fn with_database_name(database_url: &str, name: &str) -> String {
    match Url::parse(database_url) {
        Ok(mut url) => {
            url.set_path(&format!("/{name}"));
            url.to_string()
        }
        Err(e) => {
            warn!(error = %e, "DATABASE_URL is not a valid URL; DATABASE_NAME ignored");
            database_url.to_string()
        }
    }
}

/// `api/v1/` → `/api/v1`, `/` → ``.
pub fn normalize_prefix(raw: &str) -> String {
    let trimmed = raw.trim().trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("/{trimmed}")
    }
}
