//! Authentication domain models.
//!
//! `Principal` doubles as the access-token claim set, so its serde shape is
//! the wire format of the token payload.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Kind of account a principal acts as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserType {
    Admin,
    User,
    /// Any value not recognised when decoding a token or a row.
    #[serde(other)]
    Unknown,
}

impl UserType {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserType::Admin => "admin",
            UserType::User => "user",
            UserType::Unknown => "unknown",
        }
    }

    /// Parse a stored value; unrecognised strings become `Unknown`.
    pub fn parse(value: &str) -> Self {
        match value {
            "admin" => UserType::Admin,
            "user" => UserType::User,
            _ => UserType::Unknown,
        }
    }
}

impl fmt::Display for UserType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a signed token may be used for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scope {
    Login,
    ForgotPassword,
    VerifyEmail,
}

impl Scope {
    pub fn as_str(&self) -> &'static str {
        match self {
            Scope::Login => "login",
            Scope::ForgotPassword => "forgot_password",
            Scope::VerifyEmail => "verify_email",
        }
    }
}

fn default_token_version() -> i32 {
    1
}

/// The authenticated subject. Serialized as the access token payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub user_id: String,
    pub user_type: UserType,
    pub scope: Scope,
    pub device_type: String,
    #[serde(default)]
    pub current_company_id: Option<String>,
    #[serde(default = "default_token_version")]
    pub token_version: i32,
}

impl Principal {
    /// A login-scoped principal at version 1.
    pub fn login(
        user_id: impl Into<String>,
        user_type: UserType,
        device_type: impl Into<String>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            user_type,
            scope: Scope::Login,
            device_type: device_type.into(),
            current_company_id: None,
            token_version: default_token_version(),
        }
    }

    /// The refresh-store tuple this principal belongs to.
    pub fn device_key(&self) -> DeviceKey {
        DeviceKey {
            user_id: self.user_id.clone(),
            user_type: self.user_type,
            device_type: self.device_type.clone(),
        }
    }
}

/// Refresh token payload: a strict subset of the principal plus a nonce so
/// consecutive rotations never produce the same string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshClaims {
    pub user_id: String,
    pub user_type: UserType,
    pub scope: Scope,
    pub device_type: String,
    pub jti: String,
}

impl RefreshClaims {
    pub fn device_key(&self) -> DeviceKey {
        DeviceKey {
            user_id: self.user_id.clone(),
            user_type: self.user_type,
            device_type: self.device_type.clone(),
        }
    }
}

/// Payload of single-use out-of-band tokens (password reset, email verify).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScopedClaims {
    pub user_id: String,
    pub user_type: UserType,
    pub scope: Scope,
    /// Expiry (unix timestamp).
    pub exp: i64,
}

/// Identity of one refresh record: `(user_id, user_type, device_type)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DeviceKey {
    pub user_id: String,
    pub user_type: UserType,
    pub device_type: String,
}

/// Server-side refresh record. One per `DeviceKey`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshRecord {
    pub refresh_token: String,
    pub user_id: String,
    pub user_type: UserType,
    pub device_type: String,
    pub token_version: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl RefreshRecord {
    pub fn device_key(&self) -> DeviceKey {
        DeviceKey {
            user_id: self.user_id.clone(),
            user_type: self.user_type,
            device_type: self.device_type.clone(),
        }
    }
}

/// Domain user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: String,
    pub name: Option<String>,
    pub user_type: UserType,
    /// Phone dial code, e.g. `+91`.
    pub dial_code: String,
    pub current_company_id: Option<String>,
    pub email_verified: bool,
}

/// User with password hash (for internal auth flows).
#[derive(Debug, Clone)]
pub struct UserWithPassword {
    pub user: User,
    pub password_hash: Option<String>,
}

/// Input for creating a user.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub name: Option<String>,
    pub user_type: UserType,
    pub dial_code: String,
    pub password_hash: String,
}

/// Freshly minted token pair, ready to be set as cookies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    pub principal: Principal,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn principal_defaults_token_version_to_one() {
        let json = r#"{"user_id":"u1","user_type":"user","scope":"login","device_type":"web"}"#;
        let p: Principal = serde_json::from_str(json).unwrap();
        assert_eq!(p.token_version, 1);
        assert_eq!(p.current_company_id, None);
    }

    #[test]
    fn unknown_user_type_decodes_as_unknown() {
        let json = r#"{"user_id":"u1","user_type":"auditor","scope":"login","device_type":"web"}"#;
        let p: Principal = serde_json::from_str(json).unwrap();
        assert_eq!(p.user_type, UserType::Unknown);
    }

    #[test]
    fn principal_requires_scope() {
        let json = r#"{"user_id":"u1","user_type":"user","device_type":"web"}"#;
        assert!(serde_json::from_str::<Principal>(json).is_err());
    }

    #[test]
    fn scope_serializes_snake_case() {
        let s = serde_json::to_string(&Scope::ForgotPassword).unwrap();
        assert_eq!(s, "\"forgot_password\"");
        assert_eq!(Scope::VerifyEmail.as_str(), "verify_email");
    }
}
