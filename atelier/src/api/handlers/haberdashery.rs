use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};

use crate::AppState;
use crate::api::models::haberdashery::{
    ArticleCreate, ArticleQuery, ArticleResponse, ArticleTypeCreate, ArticleTypeResponse, ArticleTypeUpdate, ArticleUpdate,
    HaberdasheryMembership, HaberdasheryMembershipChange, HaberdasheryResponse, HaberdasheryUpdate, HaberdasheryWorkersUpdate,
    NameCheck, NameCheckResponse,
};
use crate::api::models::pagination::Pagination;
use crate::api::models::users::CurrentUser;
use crate::auth::permissions::{require_capability, require_haberdasher, require_member};
use crate::db::models::haberdashery::{ArticleCreateDBRequest, ArticleTypeUpdateDBRequest, ArticleUpdateDBRequest, HaberdasheryUpdateDBRequest};
use crate::errors::Result;
use crate::types::{ArticleId, ArticleTypeId, Capability, WorkerId, WorkshopId};

async fn haberdashery_response(state: &AppState, workshop_id: WorkshopId) -> Result<HaberdasheryResponse> {
    let haberdashery = state.haberdashery.get_haberdashery(workshop_id).await?;
    let workers = state.haberdashery.list_workers(workshop_id).await?;
    Ok(HaberdasheryResponse::new(haberdashery, workers))
}

#[utoipa::path(
    get,
    path = "/workshops/{workshop_id}/haberdashery",
    tag = "haberdashery",
    summary = "Get the haberdashery",
    description = "State of the supplies inventory and its worker set.",
    params(("workshop_id" = uuid::Uuid, Path, description = "Workshop ID")),
    responses(
        (status = 200, description = "Haberdashery", body = HaberdasheryResponse),
        (status = 403, description = "Not a worker of this workshop"),
        (status = 404, description = "Workshop not found")
    ),
    security(("X-Atelier-User" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn get_haberdashery(
    State(state): State<AppState>,
    Path(workshop_id): Path<WorkshopId>,
    current_user: CurrentUser,
) -> Result<Json<HaberdasheryResponse>> {
    require_member(&state, workshop_id, &current_user).await?;
    Ok(Json(haberdashery_response(&state, workshop_id).await?))
}

#[utoipa::path(
    patch,
    path = "/workshops/{workshop_id}/haberdashery",
    tag = "haberdashery",
    summary = "Update the haberdashery",
    description = "Toggle the haberdashery or move its end date. Owner or setting capability.",
    params(("workshop_id" = uuid::Uuid, Path, description = "Workshop ID")),
    request_body = HaberdasheryUpdate,
    responses(
        (status = 200, description = "Haberdashery updated", body = HaberdasheryResponse),
        (status = 403, description = "Missing capability")
    ),
    security(("X-Atelier-User" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn update_haberdashery(
    State(state): State<AppState>,
    Path(workshop_id): Path<WorkshopId>,
    current_user: CurrentUser,
    Json(update): Json<HaberdasheryUpdate>,
) -> Result<Json<HaberdasheryResponse>> {
    require_capability(&state, workshop_id, &current_user, Capability::Setting).await?;
    let haberdashery = state
        .haberdashery
        .update_haberdashery(workshop_id, &HaberdasheryUpdateDBRequest::from(update))
        .await?;
    let workers = state.haberdashery.list_workers(workshop_id).await?;
    Ok(Json(HaberdasheryResponse::new(haberdashery, workers)))
}

#[utoipa::path(
    put,
    path = "/workshops/{workshop_id}/haberdashery/workers",
    tag = "haberdashery",
    summary = "Replace the worker set",
    params(("workshop_id" = uuid::Uuid, Path, description = "Workshop ID")),
    request_body = HaberdasheryWorkersUpdate,
    responses(
        (status = 200, description = "Haberdashery with its new worker set", body = HaberdasheryResponse),
        (status = 400, description = "A worker belongs to another workshop"),
        (status = 403, description = "Missing capability")
    ),
    security(("X-Atelier-User" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn set_workers(
    State(state): State<AppState>,
    Path(workshop_id): Path<WorkshopId>,
    current_user: CurrentUser,
    Json(update): Json<HaberdasheryWorkersUpdate>,
) -> Result<Json<HaberdasheryResponse>> {
    require_capability(&state, workshop_id, &current_user, Capability::Setting).await?;
    state.haberdashery.set_workers(workshop_id, &update.worker_ids).await?;
    Ok(Json(haberdashery_response(&state, workshop_id).await?))
}

#[utoipa::path(
    get,
    path = "/workshops/{workshop_id}/haberdashery/workers/{worker_id}",
    tag = "haberdashery",
    summary = "Check worker set membership",
    params(
        ("workshop_id" = uuid::Uuid, Path, description = "Workshop ID"),
        ("worker_id" = uuid::Uuid, Path, description = "Worker ID"),
    ),
    responses(
        (status = 200, description = "Whether the worker is in the set", body = HaberdasheryMembership),
        (status = 403, description = "Not a worker of this workshop")
    ),
    security(("X-Atelier-User" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn is_member(
    State(state): State<AppState>,
    Path((workshop_id, worker_id)): Path<(WorkshopId, WorkerId)>,
    current_user: CurrentUser,
) -> Result<Json<HaberdasheryMembership>> {
    require_member(&state, workshop_id, &current_user).await?;
    let member = state.haberdashery.is_member(workshop_id, worker_id).await?;
    Ok(Json(HaberdasheryMembership { member }))
}

#[utoipa::path(
    put,
    path = "/workshops/{workshop_id}/haberdashery/workers/{worker_id}",
    tag = "haberdashery",
    summary = "Add a worker to the set",
    params(
        ("workshop_id" = uuid::Uuid, Path, description = "Workshop ID"),
        ("worker_id" = uuid::Uuid, Path, description = "Worker ID"),
    ),
    responses(
        (status = 200, description = "`changed` is false when the worker was already in", body = HaberdasheryMembershipChange),
        (status = 400, description = "Worker belongs to another workshop"),
        (status = 403, description = "Missing capability")
    ),
    security(("X-Atelier-User" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn add_worker(
    State(state): State<AppState>,
    Path((workshop_id, worker_id)): Path<(WorkshopId, WorkerId)>,
    current_user: CurrentUser,
) -> Result<Json<HaberdasheryMembershipChange>> {
    require_capability(&state, workshop_id, &current_user, Capability::Setting).await?;
    let changed = state.haberdashery.add_worker(workshop_id, worker_id).await?;
    Ok(Json(HaberdasheryMembershipChange { changed }))
}

#[utoipa::path(
    delete,
    path = "/workshops/{workshop_id}/haberdashery/workers/{worker_id}",
    tag = "haberdashery",
    summary = "Remove a worker from the set",
    params(
        ("workshop_id" = uuid::Uuid, Path, description = "Workshop ID"),
        ("worker_id" = uuid::Uuid, Path, description = "Worker ID"),
    ),
    responses(
        (status = 200, description = "`changed` is false when the worker was not in", body = HaberdasheryMembershipChange),
        (status = 403, description = "Missing capability")
    ),
    security(("X-Atelier-User" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn remove_worker(
    State(state): State<AppState>,
    Path((workshop_id, worker_id)): Path<(WorkshopId, WorkerId)>,
    current_user: CurrentUser,
) -> Result<Json<HaberdasheryMembershipChange>> {
    require_capability(&state, workshop_id, &current_user, Capability::Setting).await?;
    let changed = state.haberdashery.remove_worker(workshop_id, worker_id).await?;
    Ok(Json(HaberdasheryMembershipChange { changed }))
}

#[utoipa::path(
    get,
    path = "/workshops/{workshop_id}/haberdashery/article-types",
    tag = "haberdashery",
    summary = "List article types",
    params(("workshop_id" = uuid::Uuid, Path, description = "Workshop ID"), Pagination),
    responses(
        (status = 200, description = "Live article types", body = [ArticleTypeResponse]),
        (status = 403, description = "Not in the haberdashery worker set")
    ),
    security(("X-Atelier-User" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn list_article_types(
    State(state): State<AppState>,
    Path(workshop_id): Path<WorkshopId>,
    Query(pagination): Query<Pagination>,
    current_user: CurrentUser,
) -> Result<Json<Vec<ArticleTypeResponse>>> {
    require_haberdasher(&state, workshop_id, &current_user).await?;
    let (skip, limit) = pagination.params();
    let types = state.haberdashery.list_article_types(workshop_id, skip, limit).await?;
    Ok(Json(types.into_iter().map(Into::into).collect()))
}

#[utoipa::path(
    post,
    path = "/workshops/{workshop_id}/haberdashery/article-types",
    tag = "haberdashery",
    summary = "Create an article type",
    params(("workshop_id" = uuid::Uuid, Path, description = "Workshop ID")),
    request_body = ArticleTypeCreate,
    responses(
        (status = 201, description = "Article type created", body = ArticleTypeResponse),
        (status = 400, description = "Empty name"),
        (status = 403, description = "Not in the haberdashery worker set"),
        (status = 409, description = "Name already used in this workshop")
    ),
    security(("X-Atelier-User" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn create_article_type(
    State(state): State<AppState>,
    Path(workshop_id): Path<WorkshopId>,
    current_user: CurrentUser,
    Json(create): Json<ArticleTypeCreate>,
) -> Result<(StatusCode, Json<ArticleTypeResponse>)> {
    require_haberdasher(&state, workshop_id, &current_user).await?;
    let article_type = state.haberdashery.create_article_type(&create.into_db(workshop_id)).await?;
    Ok((StatusCode::CREATED, Json(article_type.into())))
}

#[utoipa::path(
    post,
    path = "/workshops/{workshop_id}/haberdashery/article-types/name-check",
    tag = "haberdashery",
    summary = "Check an article type name",
    params(("workshop_id" = uuid::Uuid, Path, description = "Workshop ID")),
    request_body = NameCheck,
    responses(
        (status = 200, description = "Whether the name is taken", body = NameCheckResponse),
        (status = 403, description = "Not in the haberdashery worker set")
    ),
    security(("X-Atelier-User" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn check_article_type_name(
    State(state): State<AppState>,
    Path(workshop_id): Path<WorkshopId>,
    current_user: CurrentUser,
    Json(check): Json<NameCheck>,
) -> Result<Json<NameCheckResponse>> {
    require_haberdasher(&state, workshop_id, &current_user).await?;
    let exists = state
        .haberdashery
        .article_type_name_exists(workshop_id, &check.verify, check.exclude.as_deref())
        .await?;
    Ok(Json(NameCheckResponse { exists }))
}

#[utoipa::path(
    get,
    path = "/workshops/{workshop_id}/haberdashery/article-types/{article_type_id}",
    tag = "haberdashery",
    summary = "Get an article type",
    params(
        ("workshop_id" = uuid::Uuid, Path, description = "Workshop ID"),
        ("article_type_id" = uuid::Uuid, Path, description = "Article type ID"),
    ),
    responses(
        (status = 200, description = "Article type", body = ArticleTypeResponse),
        (status = 403, description = "Not in the haberdashery worker set"),
        (status = 404, description = "Article type not found")
    ),
    security(("X-Atelier-User" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn get_article_type(
    State(state): State<AppState>,
    Path((workshop_id, article_type_id)): Path<(WorkshopId, ArticleTypeId)>,
    current_user: CurrentUser,
) -> Result<Json<ArticleTypeResponse>> {
    require_haberdasher(&state, workshop_id, &current_user).await?;
    Ok(Json(state.haberdashery.get_article_type(workshop_id, article_type_id).await?.into()))
}

#[utoipa::path(
    patch,
    path = "/workshops/{workshop_id}/haberdashery/article-types/{article_type_id}",
    tag = "haberdashery",
    summary = "Update an article type",
    description = "Renaming also renews the slug.",
    params(
        ("workshop_id" = uuid::Uuid, Path, description = "Workshop ID"),
        ("article_type_id" = uuid::Uuid, Path, description = "Article type ID"),
    ),
    request_body = ArticleTypeUpdate,
    responses(
        (status = 200, description = "Article type updated", body = ArticleTypeResponse),
        (status = 403, description = "Not in the haberdashery worker set"),
        (status = 404, description = "Article type not found"),
        (status = 409, description = "Name already used in this workshop")
    ),
    security(("X-Atelier-User" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn update_article_type(
    State(state): State<AppState>,
    Path((workshop_id, article_type_id)): Path<(WorkshopId, ArticleTypeId)>,
    current_user: CurrentUser,
    Json(update): Json<ArticleTypeUpdate>,
) -> Result<Json<ArticleTypeResponse>> {
    require_haberdasher(&state, workshop_id, &current_user).await?;
    let article_type = state
        .haberdashery
        .update_article_type(workshop_id, article_type_id, &ArticleTypeUpdateDBRequest::from(update))
        .await?;
    Ok(Json(article_type.into()))
}

#[utoipa::path(
    delete,
    path = "/workshops/{workshop_id}/haberdashery/article-types/{article_type_id}",
    tag = "haberdashery",
    summary = "Delete an article type",
    description = "Soft delete. Its articles drop out of listings.",
    params(
        ("workshop_id" = uuid::Uuid, Path, description = "Workshop ID"),
        ("article_type_id" = uuid::Uuid, Path, description = "Article type ID"),
    ),
    responses(
        (status = 204, description = "Article type deleted"),
        (status = 403, description = "Not in the haberdashery worker set"),
        (status = 404, description = "Article type not found")
    ),
    security(("X-Atelier-User" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn delete_article_type(
    State(state): State<AppState>,
    Path((workshop_id, article_type_id)): Path<(WorkshopId, ArticleTypeId)>,
    current_user: CurrentUser,
) -> Result<StatusCode> {
    require_haberdasher(&state, workshop_id, &current_user).await?;
    state.haberdashery.delete_article_type(workshop_id, article_type_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/workshops/{workshop_id}/haberdashery/article-types/{article_type_id}/name-check",
    tag = "haberdashery",
    summary = "Check an article name within its type",
    params(
        ("workshop_id" = uuid::Uuid, Path, description = "Workshop ID"),
        ("article_type_id" = uuid::Uuid, Path, description = "Article type ID"),
    ),
    request_body = NameCheck,
    responses(
        (status = 200, description = "Whether the name is taken", body = NameCheckResponse),
        (status = 403, description = "Not in the haberdashery worker set"),
        (status = 404, description = "Article type not found")
    ),
    security(("X-Atelier-User" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn check_article_name(
    State(state): State<AppState>,
    Path((workshop_id, article_type_id)): Path<(WorkshopId, ArticleTypeId)>,
    current_user: CurrentUser,
    Json(check): Json<NameCheck>,
) -> Result<Json<NameCheckResponse>> {
    require_haberdasher(&state, workshop_id, &current_user).await?;
    let exists = state
        .haberdashery
        .article_name_exists(workshop_id, article_type_id, &check.verify, check.exclude.as_deref())
        .await?;
    Ok(Json(NameCheckResponse { exists }))
}

#[utoipa::path(
    get,
    path = "/workshops/{workshop_id}/haberdashery/articles",
    tag = "haberdashery",
    summary = "List articles",
    params(("workshop_id" = uuid::Uuid, Path, description = "Workshop ID"), ArticleQuery, Pagination),
    responses(
        (status = 200, description = "Live articles of live types", body = [ArticleResponse]),
        (status = 403, description = "Not in the haberdashery worker set"),
        (status = 404, description = "Article type not found")
    ),
    security(("X-Atelier-User" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn list_articles(
    State(state): State<AppState>,
    Path(workshop_id): Path<WorkshopId>,
    Query(query): Query<ArticleQuery>,
    Query(pagination): Query<Pagination>,
    current_user: CurrentUser,
) -> Result<Json<Vec<ArticleResponse>>> {
    require_haberdasher(&state, workshop_id, &current_user).await?;
    let (skip, limit) = pagination.params();
    let articles = state
        .haberdashery
        .list_articles(workshop_id, query.article_type_id, skip, limit)
        .await?;
    Ok(Json(articles.into_iter().map(Into::into).collect()))
}

#[utoipa::path(
    post,
    path = "/workshops/{workshop_id}/haberdashery/articles",
    tag = "haberdashery",
    summary = "Create an article",
    params(("workshop_id" = uuid::Uuid, Path, description = "Workshop ID")),
    request_body = ArticleCreate,
    responses(
        (status = 201, description = "Article created", body = ArticleResponse),
        (status = 403, description = "Not in the haberdashery worker set"),
        (status = 404, description = "Article type not found"),
        (status = 409, description = "Name already used within the type")
    ),
    security(("X-Atelier-User" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn create_article(
    State(state): State<AppState>,
    Path(workshop_id): Path<WorkshopId>,
    current_user: CurrentUser,
    Json(create): Json<ArticleCreate>,
) -> Result<(StatusCode, Json<ArticleResponse>)> {
    require_haberdasher(&state, workshop_id, &current_user).await?;
    let article = state
        .haberdashery
        .create_article(workshop_id, &ArticleCreateDBRequest::from(create))
        .await?;
    Ok((StatusCode::CREATED, Json(article.into())))
}

#[utoipa::path(
    get,
    path = "/workshops/{workshop_id}/haberdashery/articles/{article_id}",
    tag = "haberdashery",
    summary = "Get an article",
    params(
        ("workshop_id" = uuid::Uuid, Path, description = "Workshop ID"),
        ("article_id" = uuid::Uuid, Path, description = "Article ID"),
    ),
    responses(
        (status = 200, description = "Article", body = ArticleResponse),
        (status = 403, description = "Not in the haberdashery worker set"),
        (status = 404, description = "Article not found")
    ),
    security(("X-Atelier-User" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn get_article(
    State(state): State<AppState>,
    Path((workshop_id, article_id)): Path<(WorkshopId, ArticleId)>,
    current_user: CurrentUser,
) -> Result<Json<ArticleResponse>> {
    require_haberdasher(&state, workshop_id, &current_user).await?;
    Ok(Json(state.haberdashery.get_article(workshop_id, article_id).await?.into()))
}

#[utoipa::path(
    patch,
    path = "/workshops/{workshop_id}/haberdashery/articles/{article_id}",
    tag = "haberdashery",
    summary = "Update an article",
    description = "Restock, rename, flag as out, or move to another type of the same workshop.",
    params(
        ("workshop_id" = uuid::Uuid, Path, description = "Workshop ID"),
        ("article_id" = uuid::Uuid, Path, description = "Article ID"),
    ),
    request_body = ArticleUpdate,
    responses(
        (status = 200, description = "Article updated", body = ArticleResponse),
        (status = 403, description = "Not in the haberdashery worker set"),
        (status = 404, description = "Article or target type not found")
    ),
    security(("X-Atelier-User" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn update_article(
    State(state): State<AppState>,
    Path((workshop_id, article_id)): Path<(WorkshopId, ArticleId)>,
    current_user: CurrentUser,
    Json(update): Json<ArticleUpdate>,
) -> Result<Json<ArticleResponse>> {
    require_haberdasher(&state, workshop_id, &current_user).await?;
    let article = state
        .haberdashery
        .update_article(workshop_id, article_id, &ArticleUpdateDBRequest::from(update))
        .await?;
    Ok(Json(article.into()))
}

#[utoipa::path(
    delete,
    path = "/workshops/{workshop_id}/haberdashery/articles/{article_id}",
    tag = "haberdashery",
    summary = "Delete an article",
    params(
        ("workshop_id" = uuid::Uuid, Path, description = "Workshop ID"),
        ("article_id" = uuid::Uuid, Path, description = "Article ID"),
    ),
    responses(
        (status = 204, description = "Article deleted"),
        (status = 403, description = "Not in the haberdashery worker set"),
        (status = 404, description = "Article not found")
    ),
    security(("X-Atelier-User" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn delete_article(
    State(state): State<AppState>,
    Path((workshop_id, article_id)): Path<(WorkshopId, ArticleId)>,
    current_user: CurrentUser,
) -> Result<StatusCode> {
    require_haberdasher(&state, workshop_id, &current_user).await?;
    state.haberdashery.delete_article(workshop_id, article_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
