//! Tax model administration. Reads are open to members; writes need admin.

use khata_core::auth::guard;
use khata_core::models::auth::Principal;
use khata_core::models::tax::{TaxModel, TaxModelInput};
use khata_core::tax::store::validate;
use khata_core::uuid::uuidv7;
use tracing::info;
use uuid::Uuid;

use crate::AppState;
use crate::error::{AppError, AppResult};

pub async fn list(state: &AppState) -> AppResult<Vec<TaxModel>> {
    Ok(state.stores.tax_models.list().await?)
}

pub async fn get(state: &AppState, id: Uuid) -> AppResult<TaxModel> {
    state
        .stores
        .tax_models
        .get(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("tax model {id}")))
}

pub async fn create(
    state: &AppState,
    principal: &Principal,
    input: TaxModelInput,
) -> AppResult<TaxModel> {
    guard::require_admin(principal)?;
    validate(&input)?;
    let model = input.into_model(uuidv7());
    state.stores.tax_models.create(&model).await?;
    info!(
        id = %model.id,
        tax_code = %model.tax_code,
        user_id = %principal.user_id,
        "tax model created"
    );
    Ok(model)
}

pub async fn replace(
    state: &AppState,
    principal: &Principal,
    id: Uuid,
    input: TaxModelInput,
) -> AppResult<TaxModel> {
    guard::require_admin(principal)?;
    validate(&input)?;
    let model = input.into_model(id);
    if !state.stores.tax_models.replace(&model).await? {
        return Err(AppError::NotFound(format!("tax model {id}")));
    }
    info!(%id, user_id = %principal.user_id, "tax model replaced");
    Ok(model)
}

pub async fn delete(state: &AppState, principal: &Principal, id: Uuid) -> AppResult<()> {
    guard::require_admin(principal)?;
    if !state.stores.tax_models.delete(id).await? {
        return Err(AppError::NotFound(format!("tax model {id}")));
    }
    info!(%id, user_id = %principal.user_id, "tax model deleted");
    Ok(())
}
