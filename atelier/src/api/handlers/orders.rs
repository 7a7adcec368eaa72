use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};

use crate::AppState;
use crate::api::models::orders::{
    FittingCreate, FittingResponse, OrderCreate, OrderGroupCreate, OrderGroupResponse, OrderResponse, OrderUpdate,
};
use crate::api::models::pagination::Pagination;
use crate::api::models::users::CurrentUser;
use crate::auth::permissions::{require_capability, require_creation, require_member};
use crate::db::models::fittings::FittingCreateDBRequest;
use crate::db::models::order_groups::OrderGroupCreateDBRequest;
use crate::db::models::orders::OrderUpdateDBRequest;
use crate::errors::Result;
use crate::types::{Capability, OrderId, ResourceKind, WorkshopId};

#[utoipa::path(
    get,
    path = "/workshops/{workshop_id}/orders",
    tag = "orders",
    summary = "List orders",
    params(("workshop_id" = uuid::Uuid, Path, description = "Workshop ID"), Pagination),
    responses(
        (status = 200, description = "Live orders, newest first", body = Vec<OrderResponse>),
        (status = 403, description = "Not a worker of this workshop"),
        (status = 404, description = "Workshop not found")
    ),
    security(("X-Atelier-User" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn list_orders(
    State(state): State<AppState>,
    Path(workshop_id): Path<WorkshopId>,
    Query(pagination): Query<Pagination>,
    current_user: CurrentUser,
) -> Result<Json<Vec<OrderResponse>>> {
    require_member(&state, workshop_id, &current_user).await?;
    let (skip, limit) = pagination.params();
    let orders = state.orders.list_orders(workshop_id, skip, limit).await?;
    Ok(Json(orders.into_iter().map(Into::into).collect()))
}

#[utoipa::path(
    post,
    path = "/workshops/{workshop_id}/orders",
    tag = "orders",
    summary = "Create order",
    description = "Requires the order capability and room under the order quota. \
                   The order is assigned to the caller unless `worker_id` is given.",
    params(("workshop_id" = uuid::Uuid, Path, description = "Workshop ID")),
    request_body = OrderCreate,
    responses(
        (status = 201, description = "Order created", body = OrderResponse),
        (status = 400, description = "Invalid amounts, dates, customer or worker"),
        (status = 403, description = "Missing capability or quota reached")
    ),
    security(("X-Atelier-User" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn create_order(
    State(state): State<AppState>,
    Path(workshop_id): Path<WorkshopId>,
    current_user: CurrentUser,
    Json(create): Json<OrderCreate>,
) -> Result<(StatusCode, Json<OrderResponse>)> {
    let acting = require_creation(&state, workshop_id, &current_user, ResourceKind::Order).await?;
    let order = state.orders.create_order(&create.into_db(workshop_id, acting.id)).await?;
    Ok((StatusCode::CREATED, Json(order.into())))
}

#[utoipa::path(
    patch,
    path = "/workshops/{workshop_id}/orders/{order_id}",
    tag = "orders",
    summary = "Update order",
    params(
        ("workshop_id" = uuid::Uuid, Path, description = "Workshop ID"),
        ("order_id" = uuid::Uuid, Path, description = "Order ID"),
    ),
    request_body = OrderUpdate,
    responses(
        (status = 200, description = "Order updated", body = OrderResponse),
        (status = 400, description = "Invalid update"),
        (status = 403, description = "Missing capability"),
        (status = 404, description = "Order not found")
    ),
    security(("X-Atelier-User" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn update_order(
    State(state): State<AppState>,
    Path((workshop_id, order_id)): Path<(WorkshopId, OrderId)>,
    current_user: CurrentUser,
    Json(update): Json<OrderUpdate>,
) -> Result<Json<OrderResponse>> {
    require_capability(&state, workshop_id, &current_user, Capability::Order).await?;
    let order = state
        .orders
        .update_order(workshop_id, order_id, &OrderUpdateDBRequest::from(update))
        .await?;
    Ok(Json(order.into()))
}

#[utoipa::path(
    delete,
    path = "/workshops/{workshop_id}/orders/{order_id}",
    tag = "orders",
    summary = "Delete order",
    params(
        ("workshop_id" = uuid::Uuid, Path, description = "Workshop ID"),
        ("order_id" = uuid::Uuid, Path, description = "Order ID"),
    ),
    responses(
        (status = 204, description = "Order deleted"),
        (status = 403, description = "Missing capability"),
        (status = 404, description = "Order not found")
    ),
    security(("X-Atelier-User" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn delete_order(
    State(state): State<AppState>,
    Path((workshop_id, order_id)): Path<(WorkshopId, OrderId)>,
    current_user: CurrentUser,
) -> Result<StatusCode> {
    require_capability(&state, workshop_id, &current_user, Capability::Order).await?;
    state.orders.delete_order(workshop_id, order_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/workshops/{workshop_id}/order-groups",
    tag = "orders",
    summary = "Create order group",
    description = "Requires the order capability and room under the order group quota.",
    params(("workshop_id" = uuid::Uuid, Path, description = "Workshop ID")),
    request_body = OrderGroupCreate,
    responses(
        (status = 201, description = "Order group created", body = OrderGroupResponse),
        (status = 400, description = "Empty group or orders outside the workshop"),
        (status = 403, description = "Missing capability or quota reached")
    ),
    security(("X-Atelier-User" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn create_order_group(
    State(state): State<AppState>,
    Path(workshop_id): Path<WorkshopId>,
    current_user: CurrentUser,
    Json(create): Json<OrderGroupCreate>,
) -> Result<(StatusCode, Json<OrderGroupResponse>)> {
    require_creation(&state, workshop_id, &current_user, ResourceKind::OrderGroup).await?;
    let request = OrderGroupCreateDBRequest {
        workshop_id,
        description: create.description,
        order_ids: create.order_ids,
    };
    let group = state.orders.create_order_group(&request).await?;
    Ok((StatusCode::CREATED, Json(group.into())))
}

#[utoipa::path(
    get,
    path = "/workshops/{workshop_id}/orders/{order_id}/fittings",
    tag = "fittings",
    summary = "List fittings of an order",
    params(
        ("workshop_id" = uuid::Uuid, Path, description = "Workshop ID"),
        ("order_id" = uuid::Uuid, Path, description = "Order ID"),
    ),
    responses(
        (status = 200, description = "Fittings in order of their number", body = Vec<FittingResponse>),
        (status = 403, description = "Not a worker of this workshop"),
        (status = 404, description = "Order not found")
    ),
    security(("X-Atelier-User" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn list_fittings(
    State(state): State<AppState>,
    Path((workshop_id, order_id)): Path<(WorkshopId, OrderId)>,
    current_user: CurrentUser,
) -> Result<Json<Vec<FittingResponse>>> {
    require_member(&state, workshop_id, &current_user).await?;
    let fittings = state.orders.list_fittings(workshop_id, order_id).await?;
    Ok(Json(fittings.into_iter().map(Into::into).collect()))
}

#[utoipa::path(
    post,
    path = "/workshops/{workshop_id}/fittings",
    tag = "fittings",
    summary = "Schedule fitting",
    description = "Requires the fitting capability and room under the fitting quota.",
    params(("workshop_id" = uuid::Uuid, Path, description = "Workshop ID")),
    request_body = FittingCreate,
    responses(
        (status = 201, description = "Fitting scheduled", body = FittingResponse),
        (status = 400, description = "Order is closed"),
        (status = 403, description = "Missing capability or quota reached"),
        (status = 404, description = "Order not found")
    ),
    security(("X-Atelier-User" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn schedule_fitting(
    State(state): State<AppState>,
    Path(workshop_id): Path<WorkshopId>,
    current_user: CurrentUser,
    Json(create): Json<FittingCreate>,
) -> Result<(StatusCode, Json<FittingResponse>)> {
    require_creation(&state, workshop_id, &current_user, ResourceKind::Fitting).await?;
    let fitting = state
        .orders
        .schedule_fitting(workshop_id, &FittingCreateDBRequest::from(create))
        .await?;
    Ok((StatusCode::CREATED, Json(fitting.into())))
}

#[cfg(test)]
mod tests {
    use crate::api::models::orders::{FittingResponse, OrderGroupResponse, OrderResponse};
    use crate::db::models::orders::{OrderStatus, PaymentStatus};
    use crate::test_utils::*;
    use axum::http::StatusCode;
    use chrono::{Duration, Utc};
    use serde_json::json;
    use sqlx::PgPool;

    fn order_body(customer_id: uuid::Uuid) -> serde_json::Value {
        let today = Utc::now().date_naive();
        json!({
            "customer_id": customer_id,
            "gender": "WOMAN",
            "type_of_clothing": "DRESS",
            "clothing_model": "Grand boubou",
            "amount": "45000",
            "down_payment": "10000",
            "estimated_delivery_date": today + Duration::days(10),
            "promised_delivery_date": today + Duration::days(12),
        })
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_order_lifecycle(pool: PgPool) {
        let app = create_test_app(pool.clone()).await;
        let state = create_test_state(pool.clone());
        let (workshop, owner) = create_workshop_with_owner(&state, "Atelier Orders", "owner@orders.example.com").await;
        let customer = create_test_customer(&state, workshop.id, "+221 70 000 00 01").await;
        let base = format!("/api/v1/workshops/{}", workshop.id);

        let (name, value) = auth_header(&owner.email);
        let response = app
            .post(&format!("{base}/orders"))
            .add_header(name, value)
            .json(&order_body(customer.id))
            .await;
        response.assert_status(StatusCode::CREATED);
        let order: OrderResponse = response.json();
        assert_eq!(order.status, OrderStatus::New);
        assert_eq!(order.payment_status, PaymentStatus::Partial);

        let (name, value) = auth_header(&owner.email);
        let updated: OrderResponse = app
            .patch(&format!("{base}/orders/{}", order.id))
            .add_header(name, value)
            .json(&json!({ "status": "IN_PROGRESS", "down_payment": "45000" }))
            .await
            .json();
        assert_eq!(updated.status, OrderStatus::InProgress);
        assert_eq!(updated.payment_status, PaymentStatus::Paid);

        // Deletion goes through DELETE only
        let (name, value) = auth_header(&owner.email);
        app.patch(&format!("{base}/orders/{}", order.id))
            .add_header(name, value)
            .json(&json!({ "status": "DELETED" }))
            .await
            .assert_status(StatusCode::BAD_REQUEST);

        let (name, value) = auth_header(&owner.email);
        let response = app
            .post(&format!("{base}/fittings"))
            .add_header(name, value)
            .json(&json!({ "order_id": order.id, "scheduled_at": Utc::now() + Duration::days(2) }))
            .await;
        response.assert_status(StatusCode::CREATED);
        let fitting: FittingResponse = response.json();
        assert_eq!(fitting.fitting_number, 1);

        let (name, value) = auth_header(&owner.email);
        let group: OrderGroupResponse = app
            .post(&format!("{base}/order-groups"))
            .add_header(name, value)
            .json(&json!({ "description": "Wedding", "order_ids": [order.id] }))
            .await
            .json();
        assert_eq!(group.order_ids, vec![order.id]);

        let (name, value) = auth_header(&owner.email);
        app.delete(&format!("{base}/orders/{}", order.id))
            .add_header(name, value)
            .await
            .assert_status(StatusCode::NO_CONTENT);

        let (name, value) = auth_header(&owner.email);
        let orders: Vec<OrderResponse> = app.get(&format!("{base}/orders")).add_header(name, value).await.json();
        assert!(orders.is_empty());
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_members_without_the_order_grant_cannot_create(pool: PgPool) {
        let app = create_test_app(pool.clone()).await;
        let state = create_test_state(pool.clone());
        let (workshop, _) = create_workshop_with_owner(&state, "Atelier Strict", "owner@strict.example.com").await;
        state
            .workshops
            .add_worker(workshop.id, "apprentice@strict.example.com")
            .await
            .unwrap();
        let customer = create_test_customer(&state, workshop.id, "+221 70 000 00 02").await;

        let (name, value) = auth_header("apprentice@strict.example.com");
        let response = app
            .post(&format!("/api/v1/workshops/{}/orders", workshop.id))
            .add_header(name, value)
            .json(&order_body(customer.id))
            .await;
        response.assert_status(StatusCode::FORBIDDEN);
        assert!(response.text().contains("add and edit the orders"));

        // Reading is open to every member
        let (name, value) = auth_header("apprentice@strict.example.com");
        app.get(&format!("/api/v1/workshops/{}/orders", workshop.id))
            .add_header(name, value)
            .await
            .assert_status_ok();
    }
}
