//! Session authority: issue, rotate, verify and revoke token pairs.
//!
//! Access tokens carry the full principal and are gated by `token_version`;
//! refresh tokens carry no expiry and are gated by presence in the refresh
//! store. Revocation bumps the stored version and retires the stored refresh
//! token, so every earlier access token fails `verify` and the old refresh
//! token fails `rotate`.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, warn};

use super::AuthError;
use super::guard;
use super::jwt::{
    TokenKind, TokenSecrets, decode_expiring_token, decode_token, encode_token, scoped_expiry,
};
use super::store::{RefreshFilter, RefreshPatch, RefreshStore, UserStore};
use crate::models::auth::{
    DeviceKey, Principal, RefreshClaims, RefreshRecord, Scope, ScopedClaims, TokenPair, User,
};
use crate::uuid::uuidv7;

/// Default access token lifetime (minutes); also the cookie max-age.
pub const DEFAULT_ACCESS_TTL_MINUTES: i64 = 30;
/// Default refresh cookie lifetime (minutes): 30 days.
pub const DEFAULT_REFRESH_TTL_MINUTES: i64 = 30 * 24 * 60;
/// Default base lifetime of out-of-band tokens (minutes).
pub const DEFAULT_EMAIL_CONFIRMATION_MINUTES: i64 = 10;

/// Lifetimes governing cookies and out-of-band tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionSettings {
    pub access_ttl_minutes: i64,
    pub refresh_ttl_minutes: i64,
    /// Base minutes for scoped tokens; callers scale it with a multiplier.
    pub email_confirmation_minutes: i64,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            access_ttl_minutes: DEFAULT_ACCESS_TTL_MINUTES,
            refresh_ttl_minutes: DEFAULT_REFRESH_TTL_MINUTES,
            email_confirmation_minutes: DEFAULT_EMAIL_CONFIRMATION_MINUTES,
        }
    }
}

/// Issues and checks credentials. Holds no state beyond its collaborators.
#[derive(Clone)]
pub struct SessionAuthority {
    secrets: TokenSecrets,
    refresh_store: Arc<dyn RefreshStore>,
    users: Arc<dyn UserStore>,
    settings: SessionSettings,
}

impl SessionAuthority {
    pub fn new(
        secrets: TokenSecrets,
        refresh_store: Arc<dyn RefreshStore>,
        users: Arc<dyn UserStore>,
        settings: SessionSettings,
    ) -> Self {
        Self {
            secrets,
            refresh_store,
            users,
            settings,
        }
    }

    pub fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    /// Sign the access/refresh pair for `principal`.
    fn mint(&self, principal: &Principal) -> Result<(String, String), AuthError> {
        let access = encode_token(principal, self.secrets.secret(TokenKind::Access))?;
        let refresh_claims = RefreshClaims {
            user_id: principal.user_id.clone(),
            user_type: principal.user_type,
            scope: principal.scope,
            device_type: principal.device_type.clone(),
            jti: uuidv7().to_string(),
        };
        let refresh = encode_token(&refresh_claims, self.secrets.secret(TokenKind::Refresh))?;
        Ok((access, refresh))
    }

    /// Start a session for `principal` on its device.
    ///
    /// Replaces any record for the same `(user_id, user_type, device_type)`.
    /// The stored version never goes backwards: a device that was revoked
    /// keeps its bumped version across re-login.
    pub async fn login(&self, mut principal: Principal) -> Result<TokenPair, AuthError> {
        guard::require_member(&principal)?;
        if principal.scope != Scope::Login {
            return Err(AuthError::Validation(format!(
                "cannot open a session with scope {}",
                principal.scope.as_str()
            )));
        }

        let key = principal.device_key();
        // The version floor must come from the deleted row itself.
        let removed = self.refresh_store.delete_one(&key).await?;
        let floor = principal.token_version.max(1);
        principal.token_version = removed
            .as_ref()
            .map_or(floor, |rec| rec.token_version.max(floor));
        if removed.is_some() {
            debug!(user_id = %key.user_id, device_type = %key.device_type, "replaced refresh record");
        }

        let (access_token, refresh_token) = self.mint(&principal)?;

        let now = Utc::now();
        self.refresh_store
            .insert(&RefreshRecord {
                refresh_token: refresh_token.clone(),
                user_id: principal.user_id.clone(),
                user_type: principal.user_type,
                device_type: principal.device_type.clone(),
                token_version: principal.token_version,
                created_at: now,
                updated_at: now,
            })
            .await?;

        info!(
            user_id = %principal.user_id,
            device_type = %principal.device_type,
            token_version = principal.token_version,
            "session issued"
        );
        Ok(TokenPair {
            access_token,
            refresh_token,
            principal,
        })
    }

    /// Exchange a refresh token for a fresh pair, rotating the record in place.
    pub async fn rotate(&self, refresh_token: &str) -> Result<TokenPair, AuthError> {
        let claims: RefreshClaims =
            decode_token(refresh_token, self.secrets.secret(TokenKind::Refresh))?;
        if claims.scope != Scope::Login {
            return Err(AuthError::invalid("refresh token has wrong scope"));
        }

        let record = self
            .refresh_store
            .find_one(&RefreshFilter::Token(refresh_token.to_string()))
            .await?
            .ok_or_else(|| AuthError::invalid("refresh token not recognised"))?;
        if record.device_key() != claims.device_key() {
            return Err(AuthError::invalid("refresh token does not match its record"));
        }

        let user = self
            .users
            .get_by_id(&claims.user_id)
            .await?
            .ok_or_else(|| AuthError::invalid("user not found"))?;

        let principal = Principal {
            user_id: claims.user_id.clone(),
            user_type: claims.user_type,
            scope: Scope::Login,
            device_type: claims.device_type.clone(),
            current_company_id: user.current_company_id,
            token_version: record.token_version,
        };
        let (access_token, new_refresh) = self.mint(&principal)?;

        let patch = RefreshPatch {
            refresh_token: Some(new_refresh.clone()),
            bump_version: false,
        };
        let filter = RefreshFilter::TokenOwner {
            refresh_token: refresh_token.to_string(),
            user_id: claims.user_id.clone(),
        };
        let updated = self
            .refresh_store
            .update_one(&filter, &patch)
            .await?
            .ok_or_else(|| {
                warn!(user_id = %claims.user_id, "refresh record changed during rotation");
                AuthError::invalid("refresh token superseded")
            })?;

        debug!(
            user_id = %updated.user_id,
            device_type = %updated.device_type,
            "session rotated"
        );
        Ok(TokenPair {
            access_token,
            refresh_token: new_refresh,
            principal,
        })
    }

    /// Admit a request carrying `access_token`.
    pub async fn verify(&self, access_token: &str) -> Result<Principal, AuthError> {
        let principal: Principal =
            decode_token(access_token, self.secrets.secret(TokenKind::Access))?;
        guard::require_scope(&principal, Scope::Login)?;

        let record = self
            .refresh_store
            .find_one(&RefreshFilter::Device(principal.device_key()))
            .await?;
        match record {
            Some(rec) if rec.token_version == principal.token_version => Ok(principal),
            _ => Err(AuthError::invalid("token revoked")),
        }
    }

    /// Log one device out: bump its version and retire its refresh token.
    ///
    /// Returns the new version, or `None` when the device had no session.
    pub async fn revoke(&self, key: &DeviceKey) -> Result<Option<i32>, AuthError> {
        let patch = RefreshPatch {
            refresh_token: Some(format!("revoked:{}", uuidv7())),
            bump_version: true,
        };
        let updated = self
            .refresh_store
            .update_one(&RefreshFilter::Device(key.clone()), &patch)
            .await?;
        if let Some(rec) = &updated {
            info!(
                user_id = %rec.user_id,
                device_type = %rec.device_type,
                token_version = rec.token_version,
                "session revoked"
            );
        }
        Ok(updated.map(|rec| rec.token_version))
    }

    /// Revoke every device of a user. Returns how many sessions were revoked.
    pub async fn revoke_all(&self, user_id: &str) -> Result<usize, AuthError> {
        let records = self.refresh_store.find_for_user(user_id).await?;
        let mut revoked = 0;
        for rec in records {
            if self.revoke(&rec.device_key()).await?.is_some() {
                revoked += 1;
            }
        }
        Ok(revoked)
    }

    /// Mint a password-reset or email-verification token for `user`.
    ///
    /// Expires `email_confirmation_minutes * multiplier` minutes from now.
    pub fn issue_scoped_token(
        &self,
        user: &User,
        scope: Scope,
        multiplier: i64,
    ) -> Result<String, AuthError> {
        if scope == Scope::Login {
            return Err(AuthError::Validation(
                "login tokens are issued by login".into(),
            ));
        }
        let claims = ScopedClaims {
            user_id: user.id.clone(),
            user_type: user.user_type,
            scope,
            exp: scoped_expiry(self.settings.email_confirmation_minutes, multiplier.max(1)),
        };
        encode_token(&claims, self.secrets.secret(TokenKind::OutOfBand))
    }

    /// Decode an out-of-band token and require `expected` scope.
    pub fn verify_scoped_token(
        &self,
        token: &str,
        expected: Scope,
    ) -> Result<ScopedClaims, AuthError> {
        let claims: ScopedClaims =
            decode_expiring_token(token, self.secrets.secret(TokenKind::OutOfBand))?;
        if claims.scope != expected {
            return Err(AuthError::invalid(format!(
                "expected scope {}, got {}",
                expected.as_str(),
                claims.scope.as_str()
            )));
        }
        Ok(claims)
    }
}
