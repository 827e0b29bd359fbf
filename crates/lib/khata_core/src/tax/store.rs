//! Tax model storage seam and input validation.

use async_trait::async_trait;
use uuid::Uuid;

use super::TaxError;
use crate::models::tax::{TaxModel, TaxModelInput};

/// Tax model collection. Read-mostly; writes are admin-gated by callers.
#[async_trait]
pub trait TaxModelStore: Send + Sync {
    async fn list(&self) -> Result<Vec<TaxModel>, TaxError>;

    async fn get(&self, id: Uuid) -> Result<Option<TaxModel>, TaxError>;

    /// Insert a new model. Duplicate `tax_code` or `(tax_code, tax_name)`
    /// yields `Conflict`.
    async fn create(&self, model: &TaxModel) -> Result<(), TaxError>;

    /// Replace an existing model. Returns whether it existed.
    async fn replace(&self, model: &TaxModel) -> Result<bool, TaxError>;

    /// Returns whether a model was deleted.
    async fn delete(&self, id: Uuid) -> Result<bool, TaxError>;

    /// Insert or overwrite by id. Idempotent.
    ///
    /// Returns `false` and writes nothing when another id already holds
    /// `model.tax_code`.
    async fn upsert(&self, model: &TaxModel) -> Result<bool, TaxError>;
}

/// Upsert every seed record. A code an admin has re-created under a new id
/// is left alone.
pub async fn seed(store: &dyn TaxModelStore, models: &[TaxModel]) -> Result<(), TaxError> {
    let mut written = 0;
    for model in models {
        if store.upsert(model).await? {
            written += 1;
        } else {
            tracing::warn!(tax_code = %model.tax_code, id = %model.id, "tax code held by another model, seed skipped");
        }
    }
    tracing::info!(count = written, "tax models seeded");
    Ok(())
}

/// Check field-level rules on a model before it is stored.
pub fn validate(input: &TaxModelInput) -> Result<(), TaxError> {
    if input.tax_code.is_empty()
        || !input
            .tax_code
            .chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit())
    {
        return Err(TaxError::Validation(format!(
            "tax_code must be uppercase alphanumeric, got {:?}",
            input.tax_code
        )));
    }
    if input.tax_name.trim().is_empty() {
        return Err(TaxError::Validation("tax_name must not be empty".into()));
    }
    if !(input.tax_rate.is_finite() && input.tax_rate >= 0.0) {
        return Err(TaxError::Validation("tax_rate must be non-negative".into()));
    }
    for component in &input.components {
        if component.name.trim().is_empty() {
            return Err(TaxError::Validation("component name must not be empty".into()));
        }
        if !(component.rate.is_finite() && component.rate >= 0.0) {
            return Err(TaxError::Validation(format!(
                "component {} rate must be non-negative",
                component.name
            )));
        }
    }
    for code in &input.jurisdiction {
        if !code.starts_with('+') || code.len() < 2 || !code[1..].chars().all(|c| c.is_ascii_digit())
        {
            return Err(TaxError::Validation(format!(
                "jurisdiction entries must be dial codes like +91, got {code:?}"
            )));
        }
    }
    Ok(())
}
