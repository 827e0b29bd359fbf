//! Jurisdictional tax models and invoice tax aggregation.

pub mod aggregate;
pub mod memory;
pub mod queries;
pub mod resolver;
pub mod store;

use thiserror::Error;

use crate::auth::AuthError;

/// Tax subsystem errors.
#[derive(Debug, Error)]
pub enum TaxError {
    #[error("Tax model not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("Database error: {0}")]
    DbError(sqlx::Error),
}

impl From<sqlx::Error> for TaxError {
    fn from(e: sqlx::Error) -> Self {
        match &e {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                TaxError::Conflict("tax model with this code and name already exists".into())
            }
            _ => TaxError::DbError(e),
        }
    }
}
