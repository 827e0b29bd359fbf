//! # khata_api
//!
//! HTTP API library for Khata.

pub mod config;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;

use axum::Router;
use axum::routing::{get, post};
use khata_core::auth::session::SessionAuthority;
use khata_core::stores::Stores;
use khata_core::tax::resolver::TaxModelResolver;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::config::ApiConfig;
use crate::error::AppError;
use crate::handlers::{auth, health, tax, tax_models};

/// Shared application state passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    /// API configuration.
    pub config: ApiConfig,
    /// Storage backends.
    pub stores: Stores,
    /// Issues and checks session tokens.
    pub sessions: SessionAuthority,
    /// Picks the tax jurisdiction for a principal.
    pub tax_resolver: TaxModelResolver,
}

impl AppState {
    /// Wire the session authority and resolver over `stores`.
    pub fn new(config: ApiConfig, stores: Stores) -> Self {
        let sessions = SessionAuthority::new(
            config.secrets.clone(),
            stores.refresh.clone(),
            stores.users.clone(),
            config.session,
        );
        let tax_resolver = TaxModelResolver::new(stores.users.clone());
        Self {
            config,
            stores,
            sessions,
            tax_resolver,
        }
    }
}

/// Run embedded database migrations.
///
/// Delegates to `khata_core::migrate::migrate()` which owns the migration files.
pub async fn migrate(pool: &sqlx::PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    khata_core::migrate::migrate(pool).await
}

async fn not_found() -> AppError {
    AppError::NotFound("no such route".into())
}

async fn not_allowed() -> AppError {
    AppError::NotAllowed("method not allowed for this route".into())
}

/// Builds the Axum router with all routes and shared state.
///
/// Every route is nested under `config.api_prefix`.
pub fn router(state: AppState) -> Router {
    // Public routes (no auth required)
    let public = Router::new()
        .route("/health", get(health::health_handler))
        .route("/auth/register", post(auth::register_handler))
        .route("/auth/login", post(auth::login_handler))
        .route("/auth/refresh", post(auth::refresh_handler))
        .route("/auth/reset-password", post(auth::reset_password_handler))
        .route("/auth/verify-email", post(auth::verify_email_handler));

    // Protected routes (require the access token cookie)
    let protected = Router::new()
        .route("/auth/me", get(auth::me_handler))
        .route("/auth/logout", post(auth::logout_handler))
        .route("/auth/devices/revoke", post(auth::revoke_device_handler))
        .route("/tax/model", get(tax::model_handler))
        .route("/tax/summary", post(tax::summary_handler))
        .route(
            "/tax-models",
            get(tax_models::list_handler).post(tax_models::create_handler),
        )
        .route(
            "/tax-models/{id}",
            get(tax_models::get_handler)
                .put(tax_models::replace_handler)
                .delete(tax_models::delete_handler),
        )
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::auth::require_auth,
        ));

    let api = Router::new()
        .merge(public)
        .merge(protected)
        .method_not_allowed_fallback(not_allowed);

    let prefix = state.config.api_prefix.clone();
    let app = if prefix.is_empty() {
        api
    } else {
        Router::new().nest(&prefix, api)
    };

    app.fallback(not_found)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}
