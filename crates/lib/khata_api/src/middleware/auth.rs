//! Authentication middleware: access-token cookie extraction and session
//! verification.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::CookieJar;
use khata_core::auth::guard;
use khata_core::models::auth::Principal;

use crate::AppState;
use crate::error::AppError;
use crate::services::cookies::ACCESS_COOKIE;

/// Key used to store the verified `Principal` in request extensions.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub Principal);

/// Axum middleware: reads the `access_token` cookie, verifies it against the
/// refresh store and injects `AuthenticatedUser` into request extensions.
pub async fn require_auth(
    State(state): State<AppState>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = jar
        .get(ACCESS_COOKIE)
        .map(|c| c.value().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| AppError::Unauthorized("missing access token cookie".into()))?;

    let principal = state.sessions.verify(&token).await?;
    guard::require_member(&principal)?;

    request.extensions_mut().insert(AuthenticatedUser(principal));
    Ok(next.run(request).await)
}
