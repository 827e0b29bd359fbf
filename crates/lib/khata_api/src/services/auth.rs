//! Authentication service: registration, password login and the session
//! flows delegating to `khata_core::auth`.

use khata_core::auth::password::{check_strength, hash_password, verify_password};
use khata_core::models::auth::{NewUser, Principal, Scope, TokenPair, User, UserType};
use tracing::info;

use crate::AppState;
use crate::error::{AppError, AppResult};
use crate::models::{LoginRequest, RegisterRequest};

fn check_device(device_type: &str) -> AppResult<()> {
    if device_type.trim().is_empty() {
        return Err(AppError::BadRequest("device_type must not be empty".into()));
    }
    Ok(())
}

fn check_email(email: &str) -> AppResult<()> {
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && domain.contains('.') => Ok(()),
        _ => Err(AppError::BadRequest(format!("invalid email address: {email}"))),
    }
}

/// Open a session for `user` on `device_type`.
async fn sign_in(state: &AppState, user: &User, device_type: &str) -> AppResult<TokenPair> {
    let mut principal = Principal::login(user.id.clone(), user.user_type, device_type);
    principal.current_company_id = user.current_company_id.clone();
    Ok(state.sessions.login(principal).await?)
}

/// Register a new account and sign it in. The first account becomes admin.
pub async fn register(state: &AppState, req: &RegisterRequest) -> AppResult<TokenPair> {
    check_email(&req.email)?;
    check_device(&req.device_type)?;
    check_strength(&req.password)?;

    let users = &state.stores.users;
    if users.find_by_email(&req.email).await?.is_some() {
        return Err(AppError::Conflict("Email already registered".into()));
    }

    let is_first_user = users.count().await? == 0;
    let user = users
        .create_user(&NewUser {
            email: req.email.trim().to_string(),
            name: req.name.clone(),
            user_type: if is_first_user {
                UserType::Admin
            } else {
                UserType::User
            },
            dial_code: req.dial_code.trim().to_string(),
            password_hash: hash_password(&req.password)?,
        })
        .await?;
    if is_first_user {
        info!(user_id = %user.id, "first user granted admin");
    }
    info!(user_id = %user.id, "user registered");

    sign_in(state, &user, &req.device_type).await
}

/// Authenticate with email and password.
///
/// Unknown email, missing hash and wrong password are indistinguishable to
/// the caller.
pub async fn login(state: &AppState, req: &LoginRequest) -> AppResult<TokenPair> {
    check_device(&req.device_type)?;

    let found = state
        .stores
        .users
        .find_by_email(&req.email)
        .await?
        .ok_or_else(|| AppError::Unauthorized("unknown email".into()))?;
    let hash = found
        .password_hash
        .as_deref()
        .ok_or_else(|| AppError::Unauthorized("account has no password".into()))?;
    if !verify_password(&req.password, hash)? {
        return Err(AppError::Unauthorized("wrong password".into()));
    }

    sign_in(state, &found.user, &req.device_type).await
}

/// Rotate the pair behind a refresh cookie.
pub async fn refresh(state: &AppState, refresh_token: &str) -> AppResult<TokenPair> {
    Ok(state.sessions.rotate(refresh_token).await?)
}

/// Revoke the caller's current device.
pub async fn logout(state: &AppState, principal: &Principal) -> AppResult<()> {
    state.sessions.revoke(&principal.device_key()).await?;
    Ok(())
}

/// Revoke another device belonging to the caller.
pub async fn revoke_device(
    state: &AppState,
    principal: &Principal,
    device_type: &str,
) -> AppResult<i32> {
    check_device(device_type)?;
    let mut key = principal.device_key();
    key.device_type = device_type.to_string();
    state
        .sessions
        .revoke(&key)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("no session for device {device_type}")))
}

/// Set a new password from a `forgot_password` token and sign out everywhere.
pub async fn reset_password(state: &AppState, token: &str, password: &str) -> AppResult<usize> {
    let claims = state
        .sessions
        .verify_scoped_token(token, Scope::ForgotPassword)?;
    check_strength(password)?;

    let hash = hash_password(password)?;
    if !state.stores.users.set_password(&claims.user_id, &hash).await? {
        return Err(AppError::Unauthorized("user no longer exists".into()));
    }
    let revoked = state.sessions.revoke_all(&claims.user_id).await?;
    info!(user_id = %claims.user_id, revoked, "password reset");
    Ok(revoked)
}

/// Mark the email behind a `verify_email` token as verified.
pub async fn verify_email(state: &AppState, token: &str) -> AppResult<()> {
    let claims = state
        .sessions
        .verify_scoped_token(token, Scope::VerifyEmail)?;
    if !state
        .stores
        .users
        .mark_email_verified(&claims.user_id)
        .await?
    {
        return Err(AppError::Unauthorized("user no longer exists".into()));
    }
    info!(user_id = %claims.user_id, "email verified");
    Ok(())
}

/// Load the user behind a verified principal.
pub async fn current_user(state: &AppState, principal: &Principal) -> AppResult<User> {
    state
        .stores
        .users
        .get_by_id(&principal.user_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("user {}", principal.user_id)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_shape() {
        assert!(check_email("a@b.co").is_ok());
        assert!(check_email("a@b").is_err());
        assert!(check_email("@b.co").is_err());
        assert!(check_email("plain").is_err());
    }

    #[test]
    fn blank_device_rejected() {
        assert!(check_device("web").is_ok());
        assert!(matches!(check_device("  "), Err(AppError::BadRequest(_))));
    }
}
