//! Database repository for orders.

use crate::db::{
    errors::{DbError, Result},
    handlers::repository::Repository,
    models::orders::{OrderCreateDBRequest, OrderDBResponse, OrderStatus, OrderUpdateDBRequest, PaymentStatus},
};
use crate::types::{OrderId, WorkerId, WorkshopId, abbrev_uuid};
use chrono::Utc;
use rand::prelude::RngExt;
use rand::rng;
use sqlx::PgConnection;
use tracing::instrument;
use uuid::Uuid;

/// Human-facing reference such as `ORD-20250101093000-482913`.
///
/// Timestamp to the second plus a random suffix; uniqueness is still enforced by the table.
pub fn generate_number(prefix: &str) -> String {
    let suffix: u32 = rng().random_range(0..1_000_000);
    format!("{prefix}-{}-{suffix:06}", Utc::now().format("%Y%m%d%H%M%S"))
}

/// Filter for listing the live orders of a workshop
#[derive(Debug, Clone)]
pub struct OrderFilter {
    pub workshop_id: WorkshopId,
    pub worker_id: Option<WorkerId>,
    pub skip: i64,
    pub limit: i64,
}

impl OrderFilter {
    pub fn new(workshop_id: WorkshopId, skip: i64, limit: i64) -> Self {
        Self {
            workshop_id,
            worker_id: None,
            skip,
            limit,
        }
    }

    pub fn for_worker(mut self, worker_id: WorkerId) -> Self {
        self.worker_id = Some(worker_id);
        self
    }
}

pub struct Orders<'c> {
    db: &'c mut PgConnection,
}

impl<'c> Orders<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    /// Live orders among `ids` that belong to the workshop
    #[instrument(skip(self, ids), fields(workshop_id = %abbrev_uuid(&workshop_id), count = ids.len()), err)]
    pub async fn get_live_in_workshop(&mut self, workshop_id: WorkshopId, ids: &[OrderId]) -> Result<Vec<OrderDBResponse>> {
        let orders = sqlx::query_as::<_, OrderDBResponse>(
            "SELECT * FROM orders WHERE workshop_id = $1 AND id = ANY($2) AND NOT is_deleted ORDER BY created_at, id",
        )
        .bind(workshop_id)
        .bind(ids)
        .fetch_all(&mut *self.db)
        .await?;

        Ok(orders)
    }
}

#[async_trait::async_trait]
impl<'c> Repository for Orders<'c> {
    type CreateRequest = OrderCreateDBRequest;
    type UpdateRequest = OrderUpdateDBRequest;
    type Response = OrderDBResponse;
    type Id = OrderId;
    type Filter = OrderFilter;

    #[instrument(skip(self, request), fields(workshop_id = %abbrev_uuid(&request.workshop_id)), err)]
    async fn create(&mut self, request: &Self::CreateRequest) -> Result<Self::Response> {
        let payment_status = PaymentStatus::from_amounts(request.amount, request.down_payment);
        let order = sqlx::query_as::<_, OrderDBResponse>(
            r#"
            INSERT INTO orders (
                id, number, workshop_id, customer_id, worker_id, gender, type_of_clothing,
                description, clothing_model, amount, down_payment, payment_status, is_urgent,
                assign_date, estimated_delivery_date, promised_delivery_date
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(generate_number("ORD"))
        .bind(request.workshop_id)
        .bind(request.customer_id)
        .bind(request.worker_id)
        .bind(request.gender)
        .bind(request.type_of_clothing)
        .bind(&request.description)
        .bind(&request.clothing_model)
        .bind(request.amount)
        .bind(request.down_payment)
        .bind(payment_status)
        .bind(request.is_urgent)
        .bind(request.assign_date)
        .bind(request.estimated_delivery_date)
        .bind(request.promised_delivery_date)
        .fetch_one(&mut *self.db)
        .await?;

        Ok(order)
    }

    #[instrument(skip(self), fields(order_id = %abbrev_uuid(&id)), err)]
    async fn get_by_id(&mut self, id: Self::Id) -> Result<Option<Self::Response>> {
        let order = sqlx::query_as::<_, OrderDBResponse>("SELECT * FROM orders WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *self.db)
            .await?;

        Ok(order)
    }

    #[instrument(skip(self, filter), fields(workshop_id = %abbrev_uuid(&filter.workshop_id)), err)]
    async fn list(&mut self, filter: &Self::Filter) -> Result<Vec<Self::Response>> {
        let orders = sqlx::query_as::<_, OrderDBResponse>(
            r#"
            SELECT * FROM orders
            WHERE workshop_id = $1 AND NOT is_deleted AND ($2::uuid IS NULL OR worker_id = $2)
            ORDER BY created_at DESC, id
            LIMIT $3 OFFSET $4
            "#,
        )
        .bind(filter.workshop_id)
        .bind(filter.worker_id)
        .bind(filter.limit)
        .bind(filter.skip)
        .fetch_all(&mut *self.db)
        .await?;

        Ok(orders)
    }

    /// Soft delete: the order is flagged and its status set to DELETED
    #[instrument(skip(self), fields(order_id = %abbrev_uuid(&id)), err)]
    async fn delete(&mut self, id: Self::Id) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE orders SET is_deleted = TRUE, status = $2, updated_at = NOW() WHERE id = $1 AND NOT is_deleted",
        )
        .bind(id)
        .bind(OrderStatus::Deleted)
        .execute(&mut *self.db)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self, request), fields(order_id = %abbrev_uuid(&id)), err)]
    async fn update(&mut self, id: Self::Id, request: &Self::UpdateRequest) -> Result<Self::Response> {
        let current = self.get_by_id(id).await?.ok_or(DbError::NotFound)?;
        let down_payment = request.down_payment.unwrap_or(current.down_payment);
        let payment_status = PaymentStatus::from_amounts(current.amount, down_payment);

        let order = sqlx::query_as::<_, OrderDBResponse>(
            r#"
            UPDATE orders SET
                status = COALESCE($2, status),
                description = COALESCE($3, description),
                down_payment = $4,
                payment_status = $5,
                is_urgent = COALESCE($6, is_urgent),
                promised_delivery_date = COALESCE($7, promised_delivery_date),
                actual_delivery_date = COALESCE($8, actual_delivery_date),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(request.status)
        .bind(&request.description)
        .bind(down_payment)
        .bind(payment_status)
        .bind(request.is_urgent)
        .bind(request.promised_delivery_date)
        .bind(request.actual_delivery_date)
        .fetch_optional(&mut *self.db)
        .await?
        .ok_or(DbError::NotFound)?;

        Ok(order)
    }
}
