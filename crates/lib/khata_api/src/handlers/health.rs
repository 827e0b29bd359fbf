//! Liveness endpoint.

use axum::Json;
use axum::extract::State;
use tracing::warn;

use crate::AppState;
use crate::models::HealthResponse;

/// `GET /health`: crate version and store connectivity.
pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    let store_connected = match state.stores.ping().await {
        Ok(()) => true,
        Err(e) => {
            warn!(error = %e, "store ping failed");
            false
        }
    };
    Json(HealthResponse {
        status: if store_connected { "ok" } else { "degraded" }.into(),
        version: khata_core::version().into(),
        store_connected,
    })
}
