use std::collections::BTreeMap;

use axum::{
    Json,
    extract::{Path, State},
};

use crate::AppState;
use crate::api::models::settings::{
    AuthorizationChange, AuthorizationSetUpdate, AuthorizationStatus, QuotaResponse, ReapplyResponse, SettingResponse,
    SettingUpdate,
};
use crate::api::models::users::CurrentUser;
use crate::auth::permissions::{require_capability, require_member};
use crate::db::models::settings::SettingUpdateDBRequest;
use crate::errors::Result;
use crate::types::{Capability, ResourceKind, WorkerId, WorkshopId};

async fn setting_response(state: &AppState, workshop_id: WorkshopId) -> Result<SettingResponse> {
    let setting = state.quota.get_or_create(workshop_id).await?;
    let authorizations = state.quota.list_authorizations(workshop_id).await?;
    Ok(SettingResponse::new(setting, authorizations))
}

#[utoipa::path(
    get,
    path = "/workshops/{workshop_id}/settings",
    tag = "settings",
    summary = "Get settings",
    description = "Quota ceilings, validity window and grant sets. Created with DEMO defaults if missing.",
    params(("workshop_id" = uuid::Uuid, Path, description = "Workshop ID")),
    responses(
        (status = 200, description = "Settings", body = SettingResponse),
        (status = 403, description = "Not a worker of this workshop"),
        (status = 404, description = "Workshop not found")
    ),
    security(("X-Atelier-User" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn get_settings(
    State(state): State<AppState>,
    Path(workshop_id): Path<WorkshopId>,
    current_user: CurrentUser,
) -> Result<Json<SettingResponse>> {
    require_member(&state, workshop_id, &current_user).await?;
    Ok(Json(setting_response(&state, workshop_id).await?))
}

#[utoipa::path(
    patch,
    path = "/workshops/{workshop_id}/settings",
    tag = "settings",
    summary = "Update settings",
    description = "Edits the fields not derived from the package. Owner or setting capability.",
    params(("workshop_id" = uuid::Uuid, Path, description = "Workshop ID")),
    request_body = SettingUpdate,
    responses(
        (status = 200, description = "Settings updated", body = SettingResponse),
        (status = 400, description = "Invalid values"),
        (status = 403, description = "Missing capability")
    ),
    security(("X-Atelier-User" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn update_settings(
    State(state): State<AppState>,
    Path(workshop_id): Path<WorkshopId>,
    current_user: CurrentUser,
    Json(update): Json<SettingUpdate>,
) -> Result<Json<SettingResponse>> {
    require_capability(&state, workshop_id, &current_user, Capability::Setting).await?;
    let setting = state
        .quota
        .update_settings(workshop_id, &SettingUpdateDBRequest::from(update))
        .await?;
    let authorizations = state.quota.list_authorizations(workshop_id).await?;
    Ok(Json(SettingResponse::new(setting, authorizations)))
}

#[utoipa::path(
    post,
    path = "/workshops/{workshop_id}/settings/reapply",
    tag = "settings",
    summary = "Re-apply package limits",
    description = "Overwrites the ceilings with the active package's profile, repairing any drift.",
    params(("workshop_id" = uuid::Uuid, Path, description = "Workshop ID")),
    responses(
        (status = 200, description = "Whether any ceiling changed", body = ReapplyResponse),
        (status = 403, description = "Missing capability")
    ),
    security(("X-Atelier-User" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn reapply_limits(
    State(state): State<AppState>,
    Path(workshop_id): Path<WorkshopId>,
    current_user: CurrentUser,
) -> Result<Json<ReapplyResponse>> {
    require_capability(&state, workshop_id, &current_user, Capability::Setting).await?;
    let changed = state.quota.reapply_limits(workshop_id).await?;
    Ok(Json(ReapplyResponse { changed }))
}

#[utoipa::path(
    get,
    path = "/workshops/{workshop_id}/settings/quotas/{kind}",
    tag = "settings",
    summary = "Check quota",
    description = "Whether one more entity of the kind fits under the ceiling. Advisory: concurrent creations may overshoot.",
    params(
        ("workshop_id" = uuid::Uuid, Path, description = "Workshop ID"),
        ("kind" = ResourceKind, Path, description = "worker, order, customer, fitting or order_group"),
    ),
    responses(
        (status = 200, description = "Quota status", body = QuotaResponse),
        (status = 403, description = "Not a worker of this workshop")
    ),
    security(("X-Atelier-User" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn check_quota(
    State(state): State<AppState>,
    Path((workshop_id, kind)): Path<(WorkshopId, ResourceKind)>,
    current_user: CurrentUser,
) -> Result<Json<QuotaResponse>> {
    require_member(&state, workshop_id, &current_user).await?;
    state.quota.get_or_create(workshop_id).await?;
    let status = state.quota.quota_status(workshop_id, kind).await?;
    Ok(Json(status.into()))
}

#[utoipa::path(
    get,
    path = "/workshops/{workshop_id}/settings/authorizations",
    tag = "settings",
    summary = "List grant sets",
    params(("workshop_id" = uuid::Uuid, Path, description = "Workshop ID")),
    responses(
        (status = 200, description = "Worker ids keyed by capability", body = BTreeMap<String, Vec<String>>),
        (status = 403, description = "Not a worker of this workshop")
    ),
    security(("X-Atelier-User" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn list_authorizations(
    State(state): State<AppState>,
    Path(workshop_id): Path<WorkshopId>,
    current_user: CurrentUser,
) -> Result<Json<BTreeMap<String, Vec<WorkerId>>>> {
    require_member(&state, workshop_id, &current_user).await?;
    Ok(Json(state.quota.list_authorizations(workshop_id).await?))
}

#[utoipa::path(
    put,
    path = "/workshops/{workshop_id}/settings/authorizations/{capability}",
    tag = "settings",
    summary = "Replace a grant set",
    description = "Workers joining or leaving the set are notified. Owner or setting capability.",
    params(
        ("workshop_id" = uuid::Uuid, Path, description = "Workshop ID"),
        ("capability" = Capability, Path, description = "order, fitting, customer, worker or setting"),
    ),
    request_body = AuthorizationSetUpdate,
    responses(
        (status = 200, description = "The new grant sets", body = BTreeMap<String, Vec<String>>),
        (status = 400, description = "A worker belongs to another workshop"),
        (status = 403, description = "Missing capability")
    ),
    security(("X-Atelier-User" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn set_authorizations(
    State(state): State<AppState>,
    Path((workshop_id, capability)): Path<(WorkshopId, Capability)>,
    current_user: CurrentUser,
    Json(update): Json<AuthorizationSetUpdate>,
) -> Result<Json<BTreeMap<String, Vec<WorkerId>>>> {
    require_capability(&state, workshop_id, &current_user, Capability::Setting).await?;
    state
        .quota
        .set_authorizations(workshop_id, capability, &update.worker_ids)
        .await?;
    Ok(Json(state.quota.list_authorizations(workshop_id).await?))
}

#[utoipa::path(
    get,
    path = "/workshops/{workshop_id}/settings/authorizations/{capability}/{worker_id}",
    tag = "settings",
    summary = "Check a grant",
    params(
        ("workshop_id" = uuid::Uuid, Path, description = "Workshop ID"),
        ("capability" = Capability, Path, description = "Capability"),
        ("worker_id" = uuid::Uuid, Path, description = "Worker ID"),
    ),
    responses(
        (status = 200, description = "Whether the worker holds the grant", body = AuthorizationStatus),
        (status = 403, description = "Not a worker of this workshop")
    ),
    security(("X-Atelier-User" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn is_authorized(
    State(state): State<AppState>,
    Path((workshop_id, capability, worker_id)): Path<(WorkshopId, Capability, WorkerId)>,
    current_user: CurrentUser,
) -> Result<Json<AuthorizationStatus>> {
    require_member(&state, workshop_id, &current_user).await?;
    let authorized = state.quota.is_authorized(workshop_id, worker_id, capability).await?;
    Ok(Json(AuthorizationStatus { authorized }))
}

#[utoipa::path(
    put,
    path = "/workshops/{workshop_id}/settings/authorizations/{capability}/{worker_id}",
    tag = "settings",
    summary = "Grant a capability",
    params(
        ("workshop_id" = uuid::Uuid, Path, description = "Workshop ID"),
        ("capability" = Capability, Path, description = "Capability"),
        ("worker_id" = uuid::Uuid, Path, description = "Worker ID"),
    ),
    responses(
        (status = 200, description = "`changed` is false when the grant already existed", body = AuthorizationChange),
        (status = 400, description = "Worker belongs to another workshop"),
        (status = 403, description = "Missing capability")
    ),
    security(("X-Atelier-User" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn grant_authorization(
    State(state): State<AppState>,
    Path((workshop_id, capability, worker_id)): Path<(WorkshopId, Capability, WorkerId)>,
    current_user: CurrentUser,
) -> Result<Json<AuthorizationChange>> {
    require_capability(&state, workshop_id, &current_user, Capability::Setting).await?;
    let changed = state
        .quota
        .grant_authorization(workshop_id, worker_id, capability)
        .await?;
    Ok(Json(AuthorizationChange { changed }))
}

#[utoipa::path(
    delete,
    path = "/workshops/{workshop_id}/settings/authorizations/{capability}/{worker_id}",
    tag = "settings",
    summary = "Revoke a capability",
    params(
        ("workshop_id" = uuid::Uuid, Path, description = "Workshop ID"),
        ("capability" = Capability, Path, description = "Capability"),
        ("worker_id" = uuid::Uuid, Path, description = "Worker ID"),
    ),
    responses(
        (status = 200, description = "`changed` is false when there was no grant", body = AuthorizationChange),
        (status = 400, description = "Worker belongs to another workshop"),
        (status = 403, description = "Missing capability")
    ),
    security(("X-Atelier-User" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn revoke_authorization(
    State(state): State<AppState>,
    Path((workshop_id, capability, worker_id)): Path<(WorkshopId, Capability, WorkerId)>,
    current_user: CurrentUser,
) -> Result<Json<AuthorizationChange>> {
    require_capability(&state, workshop_id, &current_user, Capability::Setting).await?;
    let changed = state
        .quota
        .revoke_authorization(workshop_id, worker_id, capability)
        .await?;
    Ok(Json(AuthorizationChange { changed }))
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use crate::api::models::settings::{AuthorizationChange, AuthorizationStatus, QuotaResponse, ReapplyResponse, SettingResponse};
    use crate::packages::Tier;
    use crate::test_utils::*;
    use axum::http::StatusCode;
    use serde_json::json;
    use sqlx::PgPool;
    use uuid::Uuid;

    #[sqlx::test]
    #[test_log::test]
    async fn test_settings_follow_the_package(pool: PgPool) {
        let app = create_test_app(pool.clone()).await;
        let state = create_test_state(pool.clone());
        let (workshop, owner) = create_workshop_with_owner(&state, "Atelier Settings", "owner@settings.example.com").await;
        let base = format!("/api/v1/workshops/{}/settings", workshop.id);

        let (name, value) = auth_header(&owner.email);
        let settings: SettingResponse = app.get(&base).add_header(name, value).await.json();
        assert_eq!(settings.limits, Tier::Demo.limit_profile());
        assert_eq!(settings.authorizations.len(), 5);
        assert!(settings.authorizations.values().all(Vec::is_empty));

        // Drift the ceilings by hand, then repair
        sqlx::query("UPDATE settings SET max_workers = 99 WHERE workshop_id = $1")
            .bind(workshop.id)
            .execute(&pool)
            .await
            .unwrap();
        let (name, value) = auth_header(&owner.email);
        let reapplied: ReapplyResponse = app.post(&format!("{base}/reapply")).add_header(name, value).await.json();
        assert!(reapplied.changed);

        let (name, value) = auth_header(&owner.email);
        let quota: QuotaResponse = app.get(&format!("{base}/quotas/worker")).add_header(name, value).await.json();
        assert!(quota.exists);
        assert_eq!((quota.used, quota.ceiling), (1, 5));

        let (name, value) = auth_header(&owner.email);
        app.patch(&base)
            .add_header(name, value)
            .json(&json!({ "max_order_ongoing_by_worker": 0 }))
            .await
            .assert_status(StatusCode::BAD_REQUEST);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_grant_and_revoke(pool: PgPool) {
        let app = create_test_app(pool.clone()).await;
        let state = create_test_state(pool.clone());
        let (workshop, owner) = create_workshop_with_owner(&state, "Atelier Grants HTTP", "owner@grants-http.example.com").await;
        let worker = state
            .workshops
            .add_worker(workshop.id, "tailor@grants-http.example.com")
            .await
            .unwrap();
        let grant_url = format!("/api/v1/workshops/{}/settings/authorizations/order/{}", workshop.id, worker.id);

        // A plain worker cannot hand out grants
        let (name, value) = auth_header("tailor@grants-http.example.com");
        app.put(&grant_url).add_header(name, value).await.assert_status(StatusCode::FORBIDDEN);

        let (name, value) = auth_header(&owner.email);
        let change: AuthorizationChange = app.put(&grant_url).add_header(name, value).await.json();
        assert!(change.changed);
        let (name, value) = auth_header(&owner.email);
        let change: AuthorizationChange = app.put(&grant_url).add_header(name, value).await.json();
        assert!(!change.changed);

        let (name, value) = auth_header("tailor@grants-http.example.com");
        let status: AuthorizationStatus = app.get(&grant_url).add_header(name, value).await.json();
        assert!(status.authorized);

        let (name, value) = auth_header(&owner.email);
        let change: AuthorizationChange = app.delete(&grant_url).add_header(name, value).await.json();
        assert!(change.changed);

        // Replace the whole fitting set
        let (name, value) = auth_header(&owner.email);
        let sets: BTreeMap<String, Vec<Uuid>> = app
            .put(&format!("/api/v1/workshops/{}/settings/authorizations/fitting", workshop.id))
            .add_header(name, value)
            .json(&json!({ "worker_ids": [worker.id] }))
            .await
            .json();
        assert_eq!(sets["fitting"], vec![worker.id]);
        assert!(sets["order"].is_empty());
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_cross_tenant_grant_is_rejected(pool: PgPool) {
        let app = create_test_app(pool.clone()).await;
        let state = create_test_state(pool.clone());
        let (first, owner) = create_workshop_with_owner(&state, "Atelier One", "owner@one.example.com").await;
        let (second, _) = create_workshop_with_owner(&state, "Atelier Two", "owner@two.example.com").await;
        let foreign = state.workshops.add_worker(second.id, "tailor@two.example.com").await.unwrap();

        let (name, value) = auth_header(&owner.email);
        app.put(&format!(
            "/api/v1/workshops/{}/settings/authorizations/customer/{}",
            first.id, foreign.id
        ))
        .add_header(name, value)
        .await
        .assert_status(StatusCode::BAD_REQUEST);
    }
}
