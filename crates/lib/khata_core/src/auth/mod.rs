//! Authentication and session management.
//!
//! Token codec, refresh store, session authority and scope guard. Shared by
//! the HTTP layer in `khata_api`.

pub mod guard;
pub mod jwt;
pub mod memory;
pub mod password;
pub mod queries;
pub mod session;
pub mod store;

use thiserror::Error;

/// Authentication errors.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Missing, forged, expired or revoked credentials. The detail is logged,
    /// never shown to the client.
    #[error("Invalid credentials: {0}")]
    InvalidCredentials(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Database error: {0}")]
    DbError(sqlx::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AuthError {
    pub(crate) fn invalid(detail: impl Into<String>) -> Self {
        AuthError::InvalidCredentials(detail.into())
    }
}

impl From<sqlx::Error> for AuthError {
    fn from(e: sqlx::Error) -> Self {
        match &e {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                AuthError::Conflict(db.message().to_string())
            }
            _ => AuthError::DbError(e),
        }
    }
}
