use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use chrono::Utc;

use crate::AppState;
use crate::api::models::package_history::{PackageHistoryResponse, TierAssign};
use crate::api::models::users::CurrentUser;
use crate::auth::permissions::{require_capability, require_member};
use crate::errors::Result;
use crate::services::ledger::{self, TierAssignment};
use crate::types::{Capability, WorkshopId};

#[utoipa::path(
    get,
    path = "/workshops/{workshop_id}/package-history",
    tag = "packages",
    summary = "List package history",
    params(("workshop_id" = uuid::Uuid, Path, description = "Workshop ID")),
    responses(
        (status = 200, description = "Ledger entries, newest first", body = Vec<PackageHistoryResponse>),
        (status = 403, description = "Not a worker of this workshop"),
        (status = 404, description = "Workshop not found")
    ),
    security(("X-Atelier-User" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn list_history(
    State(state): State<AppState>,
    Path(workshop_id): Path<WorkshopId>,
    current_user: CurrentUser,
) -> Result<Json<Vec<PackageHistoryResponse>>> {
    require_member(&state, workshop_id, &current_user).await?;
    let mut conn = state.db.acquire().await?;
    let history = ledger::list_history(&mut conn, workshop_id).await?;
    Ok(Json(history.into_iter().map(Into::into).collect()))
}

#[utoipa::path(
    get,
    path = "/workshops/{workshop_id}/package-history/active",
    tag = "packages",
    summary = "Get active package",
    params(("workshop_id" = uuid::Uuid, Path, description = "Workshop ID")),
    responses(
        (status = 200, description = "Active ledger entry", body = PackageHistoryResponse),
        (status = 403, description = "Not a worker of this workshop"),
        (status = 404, description = "No active package")
    ),
    security(("X-Atelier-User" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn get_active(
    State(state): State<AppState>,
    Path(workshop_id): Path<WorkshopId>,
    current_user: CurrentUser,
) -> Result<Json<PackageHistoryResponse>> {
    require_member(&state, workshop_id, &current_user).await?;
    let mut conn = state.db.acquire().await?;
    Ok(Json(ledger::get_active_tier(&mut conn, workshop_id).await?.into()))
}

#[utoipa::path(
    post,
    path = "/workshops/{workshop_id}/package-history",
    tag = "packages",
    summary = "Assign package",
    description = "Makes the tier the workshop's active package and re-derives its quota ceilings. \
                   Owner or setting capability.",
    params(("workshop_id" = uuid::Uuid, Path, description = "Workshop ID")),
    request_body = TierAssign,
    responses(
        (status = 201, description = "New active ledger entry", body = PackageHistoryResponse),
        (status = 400, description = "End date before start date"),
        (status = 403, description = "Missing capability"),
        (status = 409, description = "Tier already assigned for that start date")
    ),
    security(("X-Atelier-User" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn assign_tier(
    State(state): State<AppState>,
    Path(workshop_id): Path<WorkshopId>,
    current_user: CurrentUser,
    Json(assign): Json<TierAssign>,
) -> Result<(StatusCode, Json<PackageHistoryResponse>)> {
    require_capability(&state, workshop_id, &current_user, Capability::Setting).await?;

    let start_date = assign.start_date.unwrap_or_else(|| Utc::now().date_naive());
    let assignment = TierAssignment::builder()
        .workshop_id(workshop_id)
        .tier(assign.tier)
        .maybe_price(assign.price)
        .maybe_payment_info(assign.payment_info)
        .start_date(start_date)
        .end_date(assign.end_date.unwrap_or(start_date + assign.tier.duration()))
        .build();

    let mut conn = state.db.acquire().await?;
    let entry = ledger::assign_tier(&mut conn, &assignment).await?;
    Ok((StatusCode::CREATED, Json(entry.into())))
}
