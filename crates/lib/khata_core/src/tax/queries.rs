//! Postgres-backed tax model store.

use async_trait::async_trait;
use sqlx::types::Json;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use super::TaxError;
use super::store::TaxModelStore;
use crate::models::tax::{RateType, TaxComponent, TaxDependency, TaxModel, TaxType};

const COLUMNS: &str = "id, tax_code, tax_name, tax_type, jurisdiction, tax_rate, \
                       tax_rate_type, components, dependencies";

#[derive(FromRow)]
struct TaxModelRow {
    id: Uuid,
    tax_code: String,
    tax_name: String,
    tax_type: String,
    jurisdiction: Vec<String>,
    tax_rate: f64,
    tax_rate_type: String,
    components: Json<Vec<TaxComponent>>,
    dependencies: Json<Vec<TaxDependency>>,
}

impl From<TaxModelRow> for TaxModel {
    fn from(row: TaxModelRow) -> Self {
        TaxModel {
            id: row.id,
            tax_code: row.tax_code,
            tax_name: row.tax_name,
            tax_type: TaxType::parse(&row.tax_type).unwrap_or(TaxType::Other),
            jurisdiction: row.jurisdiction,
            tax_rate: row.tax_rate,
            tax_rate_type: RateType::parse(&row.tax_rate_type).unwrap_or(RateType::Percentage),
            components: row.components.0,
            dependencies: row.dependencies.0,
        }
    }
}

/// Tax models in the `tax_models` table.
#[derive(Clone)]
pub struct PgTaxModelStore {
    pool: PgPool,
}

impl PgTaxModelStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TaxModelStore for PgTaxModelStore {
    async fn list(&self) -> Result<Vec<TaxModel>, TaxError> {
        let sql = format!("SELECT {COLUMNS} FROM tax_models ORDER BY tax_code, tax_name");
        let rows = sqlx::query_as::<_, TaxModelRow>(&sql)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(TaxModel::from).collect())
    }

    async fn get(&self, id: Uuid) -> Result<Option<TaxModel>, TaxError> {
        let sql = format!("SELECT {COLUMNS} FROM tax_models WHERE id = $1");
        let row = sqlx::query_as::<_, TaxModelRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(TaxModel::from))
    }

    async fn create(&self, model: &TaxModel) -> Result<(), TaxError> {
        sqlx::query(
            "INSERT INTO tax_models \
             (id, tax_code, tax_name, tax_type, jurisdiction, tax_rate, tax_rate_type, components, dependencies) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
        )
        .bind(model.id)
        .bind(&model.tax_code)
        .bind(&model.tax_name)
        .bind(model.tax_type.as_str())
        .bind(&model.jurisdiction)
        .bind(model.tax_rate)
        .bind(model.tax_rate_type.as_str())
        .bind(Json(&model.components))
        .bind(Json(&model.dependencies))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn replace(&self, model: &TaxModel) -> Result<bool, TaxError> {
        let result = sqlx::query(
            "UPDATE tax_models SET \
             tax_code = $2, tax_name = $3, tax_type = $4, jurisdiction = $5, tax_rate = $6, \
             tax_rate_type = $7, components = $8, dependencies = $9, updated_at = now() \
             WHERE id = $1",
        )
        .bind(model.id)
        .bind(&model.tax_code)
        .bind(&model.tax_name)
        .bind(model.tax_type.as_str())
        .bind(&model.jurisdiction)
        .bind(model.tax_rate)
        .bind(model.tax_rate_type.as_str())
        .bind(Json(&model.components))
        .bind(Json(&model.dependencies))
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete(&self, id: Uuid) -> Result<bool, TaxError> {
        let result = sqlx::query("DELETE FROM tax_models WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn upsert(&self, model: &TaxModel) -> Result<bool, TaxError> {
        let result = sqlx::query(
            "INSERT INTO tax_models \
             (id, tax_code, tax_name, tax_type, jurisdiction, tax_rate, tax_rate_type, components, dependencies) \
             SELECT $1, $2, $3, $4, $5, $6, $7, $8, $9 \
             WHERE NOT EXISTS (SELECT 1 FROM tax_models WHERE tax_code = $2 AND id <> $1) \
             ON CONFLICT (id) DO UPDATE SET \
             tax_code = EXCLUDED.tax_code, tax_name = EXCLUDED.tax_name, \
             tax_type = EXCLUDED.tax_type, jurisdiction = EXCLUDED.jurisdiction, \
             tax_rate = EXCLUDED.tax_rate, tax_rate_type = EXCLUDED.tax_rate_type, \
             components = EXCLUDED.components, dependencies = EXCLUDED.dependencies, \
             updated_at = now()",
        )
        .bind(model.id)
        .bind(&model.tax_code)
        .bind(&model.tax_name)
        .bind(model.tax_type.as_str())
        .bind(&model.jurisdiction)
        .bind(model.tax_rate)
        .bind(model.tax_rate_type.as_str())
        .bind(Json(&model.components))
        .bind(Json(&model.dependencies))
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
