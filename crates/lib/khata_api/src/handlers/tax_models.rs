//! Tax model administration handlers.

use axum::extract::State;
use axum::http::StatusCode;
use axum::{Extension, Json};
use khata_core::models::tax::{TaxModel, TaxModelInput};
use uuid::Uuid;

use crate::AppState;
use crate::error::AppResult;
use crate::extract::{ApiJson, ApiPath};
use crate::middleware::auth::AuthenticatedUser;
use crate::services::tax_models;

/// `GET /tax-models`
pub async fn list_handler(State(state): State<AppState>) -> AppResult<Json<Vec<TaxModel>>> {
    Ok(Json(tax_models::list(&state).await?))
}

/// `GET /tax-models/{id}`
pub async fn get_handler(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
) -> AppResult<Json<TaxModel>> {
    Ok(Json(tax_models::get(&state, id).await?))
}

/// `POST /tax-models`: admin only.
pub async fn create_handler(
    State(state): State<AppState>,
    Extension(AuthenticatedUser(principal)): Extension<AuthenticatedUser>,
    ApiJson(body): ApiJson<TaxModelInput>,
) -> AppResult<(StatusCode, Json<TaxModel>)> {
    let model = tax_models::create(&state, &principal, body).await?;
    Ok((StatusCode::CREATED, Json(model)))
}

/// `PUT /tax-models/{id}`: admin only.
pub async fn replace_handler(
    State(state): State<AppState>,
    Extension(AuthenticatedUser(principal)): Extension<AuthenticatedUser>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(body): ApiJson<TaxModelInput>,
) -> AppResult<Json<TaxModel>> {
    Ok(Json(tax_models::replace(&state, &principal, id, body).await?))
}

/// `DELETE /tax-models/{id}`: admin only.
pub async fn delete_handler(
    State(state): State<AppState>,
    Extension(AuthenticatedUser(principal)): Extension<AuthenticatedUser>,
    ApiPath(id): ApiPath<Uuid>,
) -> AppResult<StatusCode> {
    tax_models::delete(&state, &principal, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
