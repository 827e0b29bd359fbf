//! Authentication request handlers.
//!
//! Tokens travel only in cookies; bodies carry the session summary.

use axum::extract::State;
use axum::{Extension, Json};
use axum_extra::extract::CookieJar;

use crate::AppState;
use crate::error::{AppError, AppResult};
use crate::extract::ApiJson;
use crate::middleware::auth::AuthenticatedUser;
use crate::models::{
    LoginRequest, MeResponse, MessageResponse, RegisterRequest, ResetPasswordRequest,
    RevokeDeviceRequest, SessionResponse, VerifyEmailRequest,
};
use crate::services::{auth, cookies};

/// `POST /auth/register`: create an account and sign it in.
pub async fn register_handler(
    State(state): State<AppState>,
    jar: CookieJar,
    ApiJson(body): ApiJson<RegisterRequest>,
) -> AppResult<(CookieJar, Json<SessionResponse>)> {
    let pair = auth::register(&state, &body).await?;
    let jar = cookies::set_session(jar, &pair, state.sessions.settings());
    Ok((jar, Json(SessionResponse::from(&pair.principal))))
}

/// `POST /auth/login`: authenticate with email + password.
pub async fn login_handler(
    State(state): State<AppState>,
    jar: CookieJar,
    ApiJson(body): ApiJson<LoginRequest>,
) -> AppResult<(CookieJar, Json<SessionResponse>)> {
    let pair = auth::login(&state, &body).await?;
    let jar = cookies::set_session(jar, &pair, state.sessions.settings());
    Ok((jar, Json(SessionResponse::from(&pair.principal))))
}

/// `POST /auth/refresh`: rotate the pair behind the refresh cookie.
pub async fn refresh_handler(
    State(state): State<AppState>,
    jar: CookieJar,
) -> AppResult<(CookieJar, Json<SessionResponse>)> {
    let token = jar
        .get(cookies::REFRESH_COOKIE)
        .map(|c| c.value().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| AppError::Unauthorized("missing refresh token cookie".into()))?;
    let pair = auth::refresh(&state, &token).await?;
    let jar = cookies::set_session(jar, &pair, state.sessions.settings());
    Ok((jar, Json(SessionResponse::from(&pair.principal))))
}

/// `POST /auth/logout`: revoke this device and clear cookies.
pub async fn logout_handler(
    State(state): State<AppState>,
    Extension(AuthenticatedUser(principal)): Extension<AuthenticatedUser>,
    jar: CookieJar,
) -> AppResult<(CookieJar, Json<MessageResponse>)> {
    auth::logout(&state, &principal).await?;
    Ok((
        cookies::clear_session(jar),
        Json(MessageResponse::new("Logged out")),
    ))
}

/// `POST /auth/devices/revoke`: sign out one of the caller's devices.
pub async fn revoke_device_handler(
    State(state): State<AppState>,
    Extension(AuthenticatedUser(principal)): Extension<AuthenticatedUser>,
    ApiJson(body): ApiJson<RevokeDeviceRequest>,
) -> AppResult<Json<MessageResponse>> {
    auth::revoke_device(&state, &principal, &body.device_type).await?;
    Ok(Json(MessageResponse::new(format!(
        "Device {} signed out",
        body.device_type
    ))))
}

/// `POST /auth/reset-password`: consume a forgot-password token.
pub async fn reset_password_handler(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<ResetPasswordRequest>,
) -> AppResult<Json<MessageResponse>> {
    auth::reset_password(&state, &body.token, &body.password).await?;
    Ok(Json(MessageResponse::new("Password updated")))
}

/// `POST /auth/verify-email`: consume an email verification token.
pub async fn verify_email_handler(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<VerifyEmailRequest>,
) -> AppResult<Json<MessageResponse>> {
    auth::verify_email(&state, &body.token).await?;
    Ok(Json(MessageResponse::new("Email verified")))
}

/// `GET /auth/me`: the signed-in user and session.
pub async fn me_handler(
    State(state): State<AppState>,
    Extension(AuthenticatedUser(principal)): Extension<AuthenticatedUser>,
) -> AppResult<Json<MeResponse>> {
    let user = auth::current_user(&state, &principal).await?;
    Ok(Json(MeResponse {
        user,
        session: SessionResponse::from(&principal),
    }))
}
