//! Scope guard: user-type and scope checks at the edge of protected operations.
//!
//! Every rejection is `InvalidCredentials`, so a caller cannot probe which
//! rule failed.

use super::AuthError;
use crate::models::auth::{Principal, Scope, UserType};

/// Admit `user` and `admin` principals.
pub fn require_member(principal: &Principal) -> Result<(), AuthError> {
    match principal.user_type {
        UserType::User | UserType::Admin => Ok(()),
        UserType::Unknown => Err(AuthError::invalid(format!(
            "user type not permitted for {}",
            principal.user_id
        ))),
    }
}

/// Admit only `admin` principals.
pub fn require_admin(principal: &Principal) -> Result<(), AuthError> {
    require_member(principal)?;
    if principal.user_type != UserType::Admin {
        return Err(AuthError::invalid(format!(
            "admin required, {} is {}",
            principal.user_id, principal.user_type
        )));
    }
    Ok(())
}

/// Admit only principals carrying `scope`.
pub fn require_scope(principal: &Principal, scope: Scope) -> Result<(), AuthError> {
    if principal.scope != scope {
        return Err(AuthError::invalid(format!(
            "expected scope {}, got {}",
            scope.as_str(),
            principal.scope.as_str()
        )));
    }
    Ok(())
}
