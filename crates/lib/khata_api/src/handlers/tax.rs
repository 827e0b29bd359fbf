//! Tax resolution and invoice summary handlers.

use axum::extract::State;
use axum::{Extension, Json};
use khata_core::models::tax::TaxModel;
use khata_core::tax::aggregate::TaxSummary;
use tracing::debug;

use crate::AppState;
use crate::error::AppResult;
use crate::extract::{ApiJson, ApiQuery};
use crate::middleware::auth::AuthenticatedUser;
use crate::models::{TaxSummaryQuery, TaxSummaryRequest};

/// `GET /tax/model`: the model that applies to the caller.
pub async fn model_handler(
    State(state): State<AppState>,
    Extension(AuthenticatedUser(principal)): Extension<AuthenticatedUser>,
) -> AppResult<Json<TaxModel>> {
    let jurisdiction = state.tax_resolver.resolve(&principal).await?;
    Ok(Json(jurisdiction.model().clone()))
}

/// `POST /tax/summary?group_by=rate|hsn`: aggregate invoice lines.
///
/// GST renders `[totals, entries, headers, "GST"]`; every other regime
/// renders `["", "", "", "<TAX TYPE>"]`.
pub async fn summary_handler(
    State(state): State<AppState>,
    Extension(AuthenticatedUser(principal)): Extension<AuthenticatedUser>,
    ApiQuery(query): ApiQuery<TaxSummaryQuery>,
    ApiJson(body): ApiJson<TaxSummaryRequest>,
) -> AppResult<Json<TaxSummary>> {
    let jurisdiction = state.tax_resolver.resolve(&principal).await?;
    debug!(
        user_id = %principal.user_id,
        items = body.items.len(),
        group_by = ?query.group_by,
        "summarizing invoice tax"
    );
    Ok(Json(jurisdiction.summarize(
        &body.items,
        body.party_state(),
        body.company_state(),
        query.group_by,
    )))
}
