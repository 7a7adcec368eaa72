use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};

use crate::AppState;
use crate::api::models::customers::{CustomerCreate, CustomerResponse};
use crate::api::models::pagination::Pagination;
use crate::api::models::users::CurrentUser;
use crate::api::models::workers::{WorkerCreate, WorkerResponse};
use crate::api::models::workshops::{WorkshopCreate, WorkshopResponse};
use crate::auth::permissions::{require_capability, require_creation, require_member};
use crate::db::models::workshops::WorkshopCreateDBRequest;
use crate::errors::Result;
use crate::types::{Capability, CustomerId, ResourceKind, WorkerId, WorkshopId};

#[utoipa::path(
    post,
    path = "/workshops",
    tag = "workshops",
    summary = "Create workshop",
    description = "Creates a workshop on the DEMO package with the caller as its owner.",
    request_body = WorkshopCreate,
    responses(
        (status = 201, description = "Workshop created", body = WorkshopResponse),
        (status = 400, description = "Invalid request"),
        (status = 401, description = "Unauthorized"),
        (status = 409, description = "Name taken, or the caller already works in a workshop"),
        (status = 500, description = "Internal server error")
    ),
    security(("X-Atelier-User" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn create_workshop(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(create): Json<WorkshopCreate>,
) -> Result<(StatusCode, Json<WorkshopResponse>)> {
    let request = WorkshopCreateDBRequest::from(create);
    let workshop = state.workshops.create_workshop(&request, Some(current_user.id)).await?;
    Ok((StatusCode::CREATED, Json(workshop.into())))
}

#[utoipa::path(
    get,
    path = "/workshops/{workshop_id}",
    tag = "workshops",
    summary = "Get workshop",
    params(("workshop_id" = uuid::Uuid, Path, description = "Workshop ID")),
    responses(
        (status = 200, description = "Workshop", body = WorkshopResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Not a worker of this workshop"),
        (status = 404, description = "Workshop not found")
    ),
    security(("X-Atelier-User" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn get_workshop(
    State(state): State<AppState>,
    Path(workshop_id): Path<WorkshopId>,
    current_user: CurrentUser,
) -> Result<Json<WorkshopResponse>> {
    require_member(&state, workshop_id, &current_user).await?;
    let workshop = state.workshops.get_workshop(workshop_id).await?;
    Ok(Json(workshop.into()))
}

#[utoipa::path(
    get,
    path = "/workshops/{workshop_id}/workers",
    tag = "workers",
    summary = "List workers",
    params(("workshop_id" = uuid::Uuid, Path, description = "Workshop ID"), Pagination),
    responses(
        (status = 200, description = "Active workers", body = Vec<WorkerResponse>),
        (status = 403, description = "Not a worker of this workshop"),
        (status = 404, description = "Workshop not found")
    ),
    security(("X-Atelier-User" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn list_workers(
    State(state): State<AppState>,
    Path(workshop_id): Path<WorkshopId>,
    Query(pagination): Query<Pagination>,
    current_user: CurrentUser,
) -> Result<Json<Vec<WorkerResponse>>> {
    require_member(&state, workshop_id, &current_user).await?;
    let (skip, limit) = pagination.params();
    let workers = state.workshops.list_workers(workshop_id, skip, limit).await?;
    Ok(Json(workers.into_iter().map(Into::into).collect()))
}

#[utoipa::path(
    post,
    path = "/workshops/{workshop_id}/workers",
    tag = "workers",
    summary = "Add worker",
    description = "Requires the worker capability and room under the worker quota.",
    params(("workshop_id" = uuid::Uuid, Path, description = "Workshop ID")),
    request_body = WorkerCreate,
    responses(
        (status = 201, description = "Worker added", body = WorkerResponse),
        (status = 400, description = "Invalid email"),
        (status = 403, description = "Missing capability or quota reached"),
        (status = 409, description = "User already works in a workshop")
    ),
    security(("X-Atelier-User" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn add_worker(
    State(state): State<AppState>,
    Path(workshop_id): Path<WorkshopId>,
    current_user: CurrentUser,
    Json(create): Json<WorkerCreate>,
) -> Result<(StatusCode, Json<WorkerResponse>)> {
    require_creation(&state, workshop_id, &current_user, ResourceKind::Worker).await?;
    let worker = state.workshops.add_worker(workshop_id, &create.email).await?;
    Ok((StatusCode::CREATED, Json(worker.into())))
}

#[utoipa::path(
    delete,
    path = "/workshops/{workshop_id}/workers/{worker_id}",
    tag = "workers",
    summary = "Remove worker",
    params(
        ("workshop_id" = uuid::Uuid, Path, description = "Workshop ID"),
        ("worker_id" = uuid::Uuid, Path, description = "Worker ID"),
    ),
    responses(
        (status = 204, description = "Worker removed"),
        (status = 400, description = "The owner cannot be removed"),
        (status = 403, description = "Missing capability"),
        (status = 404, description = "Worker not found")
    ),
    security(("X-Atelier-User" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn remove_worker(
    State(state): State<AppState>,
    Path((workshop_id, worker_id)): Path<(WorkshopId, WorkerId)>,
    current_user: CurrentUser,
) -> Result<StatusCode> {
    require_capability(&state, workshop_id, &current_user, Capability::Worker).await?;
    state.workshops.remove_worker(workshop_id, worker_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/workshops/{workshop_id}/customers",
    tag = "customers",
    summary = "List customers",
    params(("workshop_id" = uuid::Uuid, Path, description = "Workshop ID"), Pagination),
    responses(
        (status = 200, description = "Active customers", body = Vec<CustomerResponse>),
        (status = 403, description = "Missing capability"),
        (status = 404, description = "Workshop not found")
    ),
    security(("X-Atelier-User" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn list_customers(
    State(state): State<AppState>,
    Path(workshop_id): Path<WorkshopId>,
    Query(pagination): Query<Pagination>,
    current_user: CurrentUser,
) -> Result<Json<Vec<CustomerResponse>>> {
    require_capability(&state, workshop_id, &current_user, Capability::Customer).await?;
    let (skip, limit) = pagination.params();
    let customers = state.workshops.list_customers(workshop_id, skip, limit).await?;
    Ok(Json(customers.into_iter().map(Into::into).collect()))
}

#[utoipa::path(
    post,
    path = "/workshops/{workshop_id}/customers",
    tag = "customers",
    summary = "Create customer",
    description = "Requires the customer capability and room under the customer quota.",
    params(("workshop_id" = uuid::Uuid, Path, description = "Workshop ID")),
    request_body = CustomerCreate,
    responses(
        (status = 201, description = "Customer created", body = CustomerResponse),
        (status = 400, description = "Invalid request"),
        (status = 403, description = "Missing capability or quota reached"),
        (status = 409, description = "Phone number already used in this workshop")
    ),
    security(("X-Atelier-User" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn create_customer(
    State(state): State<AppState>,
    Path(workshop_id): Path<WorkshopId>,
    current_user: CurrentUser,
    Json(create): Json<CustomerCreate>,
) -> Result<(StatusCode, Json<CustomerResponse>)> {
    require_creation(&state, workshop_id, &current_user, ResourceKind::Customer).await?;
    let customer = state.workshops.create_customer(&create.into_db(workshop_id)).await?;
    Ok((StatusCode::CREATED, Json(customer.into())))
}

#[utoipa::path(
    delete,
    path = "/workshops/{workshop_id}/customers/{customer_id}",
    tag = "customers",
    summary = "Remove customer",
    params(
        ("workshop_id" = uuid::Uuid, Path, description = "Workshop ID"),
        ("customer_id" = uuid::Uuid, Path, description = "Customer ID"),
    ),
    responses(
        (status = 204, description = "Customer removed"),
        (status = 403, description = "Missing capability"),
        (status = 404, description = "Customer not found")
    ),
    security(("X-Atelier-User" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn remove_customer(
    State(state): State<AppState>,
    Path((workshop_id, customer_id)): Path<(WorkshopId, CustomerId)>,
    current_user: CurrentUser,
) -> Result<StatusCode> {
    require_capability(&state, workshop_id, &current_user, Capability::Customer).await?;
    state.workshops.remove_customer(workshop_id, customer_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use crate::api::models::customers::CustomerResponse;
    use crate::api::models::workers::WorkerResponse;
    use crate::api::models::workshops::WorkshopResponse;
    use crate::test_utils::*;
    use crate::types::Capability;
    use axum::http::StatusCode;
    use serde_json::json;
    use sqlx::PgPool;

    fn customer_body(i: usize) -> serde_json::Value {
        json!({
            "first_name": "Fatou",
            "last_name": format!("Sow {i}"),
            "nickname": format!("fs{i}"),
            "gender": "WOMAN",
            "phone": format!("+221 78 000 00 {i:02}"),
        })
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_create_workshop_makes_caller_owner(pool: PgPool) {
        let app = create_test_app(pool.clone()).await;
        let (name, value) = auth_header("founder@example.com");

        let response = app
            .post("/api/v1/workshops")
            .add_header(name, value)
            .json(&json!({
                "name": "Couture Dakar",
                "phone": "+221 33 000 00 00",
                "country": "Senegal",
            }))
            .await;
        response.assert_status(StatusCode::CREATED);
        let workshop: WorkshopResponse = response.json();
        assert_eq!(workshop.slug, "couture-dakar");

        let (name, value) = auth_header("founder@example.com");
        let workers: Vec<WorkerResponse> = app
            .get(&format!("/api/v1/workshops/{}/workers", workshop.id))
            .add_header(name, value)
            .await
            .json();
        assert_eq!(workers.len(), 1);
        assert!(workers[0].is_owner);

        // Someone else cannot look at it
        let (name, value) = auth_header("snoop@example.com");
        app.get(&format!("/api/v1/workshops/{}", workshop.id))
            .add_header(name, value)
            .await
            .assert_status(StatusCode::FORBIDDEN);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_worker_quota_on_demo(pool: PgPool) {
        let app = create_test_app(pool.clone()).await;
        let state = create_test_state(pool.clone());
        let (workshop, _) = create_workshop_with_owner(&state, "Atelier Quota", "owner@quota.example.com").await;
        let url = format!("/api/v1/workshops/{}/workers", workshop.id);

        // The owner is the first of five
        for i in 0..4 {
            let (name, value) = auth_header("owner@quota.example.com");
            app.post(&url)
                .add_header(name, value)
                .json(&json!({ "email": format!("w{i}@quota.example.com") }))
                .await
                .assert_status(StatusCode::CREATED);
        }

        let (name, value) = auth_header("owner@quota.example.com");
        let response = app
            .post(&url)
            .add_header(name, value)
            .json(&json!({ "email": "one-too-many@quota.example.com" }))
            .await;
        response.assert_status(StatusCode::FORBIDDEN);
        assert!(response.text().contains("quota"));
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_customers_need_the_customer_grant(pool: PgPool) {
        let app = create_test_app(pool.clone()).await;
        let state = create_test_state(pool.clone());
        let (workshop, _) = create_workshop_with_owner(&state, "Atelier Grants", "owner@grants.example.com").await;
        let member = state
            .workshops
            .add_worker(workshop.id, "member@grants.example.com")
            .await
            .unwrap();
        let url = format!("/api/v1/workshops/{}/customers", workshop.id);

        let (name, value) = auth_header("member@grants.example.com");
        app.post(&url)
            .add_header(name, value)
            .json(&customer_body(1))
            .await
            .assert_status(StatusCode::FORBIDDEN);

        state
            .quota
            .grant_authorization(workshop.id, member.id, Capability::Customer)
            .await
            .unwrap();

        let (name, value) = auth_header("member@grants.example.com");
        let response = app.post(&url).add_header(name, value).json(&customer_body(1)).await;
        response.assert_status(StatusCode::CREATED);
        let customer: CustomerResponse = response.json();

        // Same phone twice in one workshop conflicts
        let (name, value) = auth_header("member@grants.example.com");
        app.post(&url)
            .add_header(name, value)
            .json(&customer_body(1))
            .await
            .assert_status(StatusCode::CONFLICT);

        let (name, value) = auth_header("member@grants.example.com");
        app.delete(&format!("{url}/{}", customer.id))
            .add_header(name, value)
            .await
            .assert_status(StatusCode::NO_CONTENT);

        let (name, value) = auth_header("owner@grants.example.com");
        let customers: Vec<CustomerResponse> = app.get(&url).add_header(name, value).await.json();
        assert!(customers.is_empty());
    }
}
