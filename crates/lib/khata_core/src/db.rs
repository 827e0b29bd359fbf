//! PostgreSQL connection lifecycle.
//!
//! The pool is opened once at startup, pinged before the server accepts
//! traffic, and closed on shutdown.

use std::time::Duration;

use sqlx::postgres::{PgPool, PgPoolOptions};
use thiserror::Error;
use tracing::{info, warn};

/// Maximum time to wait for a pooled connection.
const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(30);

/// Errors that can occur while bringing the database up.
#[derive(Debug, Error)]
pub enum DbError {
    #[error("SQL error: {0}")]
    Sql(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    #[error("Database ping failed: {0}")]
    Ping(String),
}

/// Result type for database operations.
pub type Result<T> = std::result::Result<T, DbError>;

/// Open a pool and verify it answers.
pub async fn connect(database_url: &str, max_connections: u32) -> Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .acquire_timeout(ACQUIRE_TIMEOUT)
        .connect(database_url)
        .await?;
    ping(&pool).await?;
    info!(max_connections, "database connection established");
    Ok(pool)
}

/// Round-trip a trivial query.
pub async fn ping(pool: &PgPool) -> Result<()> {
    let one = sqlx::query_scalar::<_, i32>("SELECT 1")
        .fetch_one(pool)
        .await
        .map_err(|e| DbError::Ping(e.to_string()))?;
    if one != 1 {
        warn!(one, "unexpected ping result");
        return Err(DbError::Ping(format!("expected 1, got {one}")));
    }
    Ok(())
}

/// Close every pooled connection.
pub async fn close(pool: &PgPool) {
    pool.close().await;
    info!("database connection closed");
}
