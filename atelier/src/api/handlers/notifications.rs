use axum::{
    Json,
    extract::{Path, Query, State},
};

use crate::AppState;
use crate::api::models::notifications::{ExternalNotificationResponse, ListNotificationsQuery, NotificationResponse};
use crate::api::models::users::CurrentUser;
use crate::auth::permissions::require_capability;
use crate::db::handlers::Notifications;
use crate::errors::{Error, Result};
use crate::types::{Capability, NotificationId, WorkshopId};

#[utoipa::path(
    get,
    path = "/notifications",
    tag = "notifications",
    summary = "List my notifications",
    params(ListNotificationsQuery),
    responses(
        (status = 200, description = "Notifications, newest first", body = Vec<NotificationResponse>),
        (status = 401, description = "Unauthorized")
    ),
    security(("X-Atelier-User" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn list_notifications(
    State(state): State<AppState>,
    Query(query): Query<ListNotificationsQuery>,
    current_user: CurrentUser,
) -> Result<Json<Vec<NotificationResponse>>> {
    let mut conn = state.db.acquire().await?;
    let notifications = Notifications::new(&mut conn)
        .list_for_user(current_user.id, query.unread_only.unwrap_or(true))
        .await?;
    Ok(Json(notifications.into_iter().map(Into::into).collect()))
}

#[utoipa::path(
    patch,
    path = "/notifications/{notification_id}",
    tag = "notifications",
    summary = "Mark notification read",
    params(("notification_id" = uuid::Uuid, Path, description = "Notification ID")),
    responses(
        (status = 200, description = "Notification marked read", body = NotificationResponse),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "No such notification for this user")
    ),
    security(("X-Atelier-User" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn mark_read(
    State(state): State<AppState>,
    Path(notification_id): Path<NotificationId>,
    current_user: CurrentUser,
) -> Result<Json<NotificationResponse>> {
    let mut conn = state.db.acquire().await?;
    let notification = Notifications::new(&mut conn)
        .mark_read(current_user.id, notification_id)
        .await?
        .ok_or_else(|| Error::not_found("Notification", notification_id))?;
    Ok(Json(notification.into()))
}

#[utoipa::path(
    get,
    path = "/workshops/{workshop_id}/external-notifications",
    tag = "notifications",
    summary = "List queued customer messages",
    description = "Messages queued for the workshop's customers. Requires the customer capability.",
    params(("workshop_id" = uuid::Uuid, Path, description = "Workshop ID")),
    responses(
        (status = 200, description = "Queued messages", body = Vec<ExternalNotificationResponse>),
        (status = 403, description = "Missing capability")
    ),
    security(("X-Atelier-User" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn list_external(
    State(state): State<AppState>,
    Path(workshop_id): Path<WorkshopId>,
    current_user: CurrentUser,
) -> Result<Json<Vec<ExternalNotificationResponse>>> {
    require_capability(&state, workshop_id, &current_user, Capability::Customer).await?;
    let mut conn = state.db.acquire().await?;
    let messages = Notifications::new(&mut conn).list_external_for_workshop(workshop_id).await?;
    Ok(Json(messages.into_iter().map(Into::into).collect()))
}
