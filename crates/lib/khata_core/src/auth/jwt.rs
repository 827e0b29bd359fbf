//! JWT token codec (HS256) and signing secret resolution.

use std::fmt;
use std::path::PathBuf;

use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use rand::distr::Alphanumeric;
use rand::{Rng, rng};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, info};

use super::AuthError;

/// Which of the three signing secrets a token is bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Access,
    Refresh,
    /// Password-reset and email-verification tokens.
    OutOfBand,
}

/// The three independent HS256 secrets.
#[derive(Clone)]
pub struct TokenSecrets {
    access: String,
    refresh: String,
    out_of_band: String,
}

impl TokenSecrets {
    pub fn new(
        access: impl Into<String>,
        refresh: impl Into<String>,
        out_of_band: impl Into<String>,
    ) -> Self {
        Self {
            access: access.into(),
            refresh: refresh.into(),
            out_of_band: out_of_band.into(),
        }
    }

    /// Resolve each secret from its env var, falling back to a persisted file.
    pub fn resolve() -> Self {
        Self {
            access: resolve_secret("ACCESS_TOKEN_SECRET", "access-token-secret"),
            refresh: resolve_secret("REFRESH_TOKEN_SECRET", "refresh-token-secret"),
            out_of_band: resolve_secret(
                "FORGOT_PASSWORD_TOKEN_SECRET",
                "forgot-password-token-secret",
            ),
        }
    }

    pub fn secret(&self, kind: TokenKind) -> &[u8] {
        match kind {
            TokenKind::Access => self.access.as_bytes(),
            TokenKind::Refresh => self.refresh.as_bytes(),
            TokenKind::OutOfBand => self.out_of_band.as_bytes(),
        }
    }
}

impl fmt::Debug for TokenSecrets {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenSecrets")
            .field("access", &"<redacted>")
            .field("refresh", &"<redacted>")
            .field("out_of_band", &"<redacted>")
            .finish()
    }
}

/// Sign `claims` as a compact HS256 JWS.
pub fn encode_token<C: Serialize>(claims: &C, secret: &[u8]) -> Result<String, AuthError> {
    encode(
        &Header::new(Algorithm::HS256),
        claims,
        &EncodingKey::from_secret(secret),
    )
    .map_err(|e| AuthError::Internal(format!("jwt encode: {e}")))
}

/// Verify and decode a token whose `exp` claim is optional.
///
/// Signature mismatch, malformed input and expiry all collapse into
/// `InvalidCredentials`.
pub fn decode_token<C: DeserializeOwned>(token: &str, secret: &[u8]) -> Result<C, AuthError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.required_spec_claims.clear();
    validation.validate_exp = true;
    decode_with(token, secret, &validation)
}

/// Verify and decode a token that must carry a future `exp`.
pub fn decode_expiring_token<C: DeserializeOwned>(
    token: &str,
    secret: &[u8],
) -> Result<C, AuthError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_required_spec_claims(&["exp"]);
    validation.validate_exp = true;
    decode_with(token, secret, &validation)
}

fn decode_with<C: DeserializeOwned>(
    token: &str,
    secret: &[u8],
    validation: &Validation,
) -> Result<C, AuthError> {
    decode::<C>(token, &DecodingKey::from_secret(secret), validation)
        .map(|data| data.claims)
        .map_err(|e| {
            debug!(error = %e, "token rejected");
            AuthError::invalid("could not validate token")
        })
}

/// Absolute expiry for out-of-band tokens: `base_minutes * multiplier` from now.
pub fn scoped_expiry(base_minutes: i64, multiplier: i64) -> i64 {
    (Utc::now() + Duration::minutes(base_minutes.saturating_mul(multiplier))).timestamp()
}

/// Resolve a secret: env var `env_key` → persisted file → freshly generated.
pub fn resolve_secret(env_key: &str, file_name: &str) -> String {
    if let Ok(secret) = std::env::var(env_key)
        && !secret.is_empty()
    {
        return secret;
    }
    let secret_path = secret_path(file_name);
    if let Ok(existing) = std::fs::read_to_string(&secret_path) {
        let trimmed = existing.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }
    let secret: String = rng()
        .sample_iter(&Alphanumeric)
        .take(64)
        .map(char::from)
        .collect();
    if let Some(parent) = secret_path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }
    let _ = std::fs::write(&secret_path, &secret);
    info!(env_key, path = %secret_path.display(), "generated new signing secret");
    secret
}

fn secret_path(file_name: &str) -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("khata")
        .join(file_name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::auth::{Principal, RefreshClaims, Scope, ScopedClaims, UserType};

    const SECRET: &[u8] = b"test-access-secret";

    fn principal() -> Principal {
        Principal {
            user_id: "u1".into(),
            user_type: UserType::User,
            scope: Scope::Login,
            device_type: "web".into(),
            current_company_id: Some("c1".into()),
            token_version: 3,
        }
    }

    #[test]
    fn principal_roundtrips() {
        let token = encode_token(&principal(), SECRET).unwrap();
        let decoded: Principal = decode_token(&token, SECRET).unwrap();
        assert_eq!(decoded, principal());
    }

    #[test]
    fn token_is_compact_hs256_jwt() {
        let token = encode_token(&principal(), SECRET).unwrap();
        assert_eq!(token.split('.').count(), 3);
        let header = jsonwebtoken::decode_header(&token).unwrap();
        assert_eq!(header.alg, Algorithm::HS256);
        assert_eq!(header.typ.as_deref(), Some("JWT"));
    }

    #[test]
    fn wrong_secret_is_invalid_credentials() {
        let token = encode_token(&principal(), SECRET).unwrap();
        let err = decode_token::<Principal>(&token, b"other-secret").unwrap_err();
        assert!(matches!(err, AuthError::InvalidCredentials(_)));
    }

    #[test]
    fn garbage_is_invalid_credentials() {
        let err = decode_token::<Principal>("not.a.token", SECRET).unwrap_err();
        assert!(matches!(err, AuthError::InvalidCredentials(_)));
    }

    #[test]
    fn missing_claims_are_invalid_credentials() {
        let partial = serde_json::json!({"user_id": "u1", "scope": "login"});
        let token = encode_token(&partial, SECRET).unwrap();
        let err = decode_token::<Principal>(&token, SECRET).unwrap_err();
        assert!(matches!(err, AuthError::InvalidCredentials(_)));
    }

    #[test]
    fn expired_scoped_token_is_invalid_credentials() {
        let claims = ScopedClaims {
            user_id: "u1".into(),
            user_type: UserType::User,
            scope: Scope::ForgotPassword,
            exp: Utc::now().timestamp() - 3600,
        };
        let token = encode_token(&claims, SECRET).unwrap();
        let err = decode_expiring_token::<ScopedClaims>(&token, SECRET).unwrap_err();
        assert!(matches!(err, AuthError::InvalidCredentials(_)));
    }

    #[test]
    fn live_scoped_token_decodes() {
        let claims = ScopedClaims {
            user_id: "u1".into(),
            user_type: UserType::User,
            scope: Scope::VerifyEmail,
            exp: scoped_expiry(10, 3),
        };
        let token = encode_token(&claims, SECRET).unwrap();
        let decoded: ScopedClaims = decode_expiring_token(&token, SECRET).unwrap();
        assert_eq!(decoded, claims);
    }

    #[test]
    fn refresh_claims_carry_no_expiry() {
        let claims = RefreshClaims {
            user_id: "u1".into(),
            user_type: UserType::Admin,
            scope: Scope::Login,
            device_type: "android".into(),
            jti: "n1".into(),
        };
        let token = encode_token(&claims, SECRET).unwrap();
        let payload: serde_json::Value = decode_token(&token, SECRET).unwrap();
        assert!(payload.get("exp").is_none());
        // Expiring decode insists on `exp`.
        assert!(decode_expiring_token::<RefreshClaims>(&token, SECRET).is_err());
    }

    #[test]
    fn scoped_expiry_scales_with_multiplier() {
        let now = Utc::now().timestamp();
        let exp = scoped_expiry(10, 6);
        assert!(exp >= now + 3599 && exp <= now + 3601);
    }

    #[test]
    fn secrets_select_by_kind_and_redact_debug() {
        let secrets = TokenSecrets::new("a", "r", "o");
        assert_eq!(secrets.secret(TokenKind::Access), b"a");
        assert_eq!(secrets.secret(TokenKind::Refresh), b"r");
        assert_eq!(secrets.secret(TokenKind::OutOfBand), b"o");
        assert!(!format!("{secrets:?}").contains("\"a\""));
    }
}
