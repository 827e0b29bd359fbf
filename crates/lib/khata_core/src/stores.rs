//! Bundle of storage backends handed to the services.

use std::sync::Arc;

use sqlx::PgPool;

use crate::auth::memory::{MemoryRefreshStore, MemoryUserStore};
use crate::auth::queries::{PgRefreshStore, PgUserStore};
use crate::auth::store::{RefreshStore, UserStore};
use crate::db::{self, DbError};
use crate::tax::memory::MemoryTaxModelStore;
use crate::tax::queries::PgTaxModelStore;
use crate::tax::store::TaxModelStore;

/// Storage collaborators shared process-wide.
#[derive(Clone)]
pub struct Stores {
    pub refresh: Arc<dyn RefreshStore>,
    pub users: Arc<dyn UserStore>,
    pub tax_models: Arc<dyn TaxModelStore>,
    /// Present when backed by Postgres; used for health checks.
    pub pool: Option<PgPool>,
}

impl Stores {
    pub fn postgres(pool: PgPool) -> Self {
        Self {
            refresh: Arc::new(PgRefreshStore::new(pool.clone())),
            users: Arc::new(PgUserStore::new(pool.clone())),
            tax_models: Arc::new(PgTaxModelStore::new(pool.clone())),
            pool: Some(pool),
        }
    }

    pub fn in_memory() -> Self {
        Self {
            refresh: Arc::new(MemoryRefreshStore::new()),
            users: Arc::new(MemoryUserStore::new()),
            tax_models: Arc::new(MemoryTaxModelStore::new()),
            pool: None,
        }
    }

    /// Ping the backing database. In-memory stores always answer.
    pub async fn ping(&self) -> Result<(), DbError> {
        match &self.pool {
            Some(pool) => db::ping(pool).await,
            None => Ok(()),
        }
    }
}
