//! Orders, order groups and fittings.
//!
//! Notifications fire on transitions only: an update that sets the status an
//! order already has, or that leaves an already paid order paid, is silent.

use sqlx::{PgConnection, PgPool};
use tracing::{info, instrument};

use crate::db::handlers::orders::OrderFilter;
use crate::db::handlers::{Customers, Fittings, OrderGroups, Orders, Repository, Workers};
use crate::db::models::fittings::{FittingCreateDBRequest, FittingDBResponse};
use crate::db::models::order_groups::{OrderGroupCreateDBRequest, OrderGroupDBResponse};
use crate::db::models::orders::{OrderCreateDBRequest, OrderDBResponse, OrderStatus, OrderUpdateDBRequest, PaymentStatus};
use crate::errors::{Error, Result};
use crate::notifications::{NotificationEvent, Notifier, OrderChange};
use crate::services::ensure_workshop;
use crate::types::{OrderId, WorkshopId, abbrev_uuid};

/// Events produced by moving an order from `before` to `after`
fn transition_events(before: &OrderDBResponse, after: &OrderDBResponse) -> Vec<NotificationEvent> {
    let mut events = Vec::new();
    if before.status != after.status {
        let change = match after.status {
            OrderStatus::InProgress => Some(OrderChange::InProgress),
            OrderStatus::Completed => Some(OrderChange::Completed),
            OrderStatus::Cancelled => Some(OrderChange::Cancelled),
            OrderStatus::New | OrderStatus::Deleted => None,
        };
        if let Some(change) = change {
            events.push(NotificationEvent::OrderUpdated { order_id: after.id, change });
        }
    }
    if before.payment_status != PaymentStatus::Paid && after.payment_status == PaymentStatus::Paid {
        events.push(NotificationEvent::OrderUpdated {
            order_id: after.id,
            change: OrderChange::Paid,
        });
    }
    events
}

/// A live order of the workshop, or NotFound
async fn live_order(conn: &mut PgConnection, workshop_id: WorkshopId, order_id: OrderId) -> Result<OrderDBResponse> {
    Orders::new(conn)
        .get_by_id(order_id)
        .await?
        .filter(|o| o.workshop_id == workshop_id && !o.is_deleted)
        .ok_or_else(|| Error::not_found("Order", order_id))
}

#[derive(Clone)]
pub struct OrderService {
    pool: PgPool,
    notifier: Notifier,
}

impl OrderService {
    pub fn new(pool: PgPool, notifier: Notifier) -> Self {
        Self { pool, notifier }
    }

    #[instrument(skip(self, request), fields(workshop_id = %abbrev_uuid(&request.workshop_id)), err)]
    pub async fn create_order(&self, request: &OrderCreateDBRequest) -> Result<OrderDBResponse> {
        if request.amount.is_sign_negative() || request.down_payment.is_sign_negative() {
            return Err(Error::Validation {
                message: "Amounts cannot be negative".to_string(),
            });
        }
        if request.down_payment > request.amount {
            return Err(Error::Validation {
                message: "Down payment cannot exceed the order amount".to_string(),
            });
        }
        if request.promised_delivery_date < request.estimated_delivery_date {
            return Err(Error::Validation {
                message: "Promised delivery date cannot be before the estimated delivery date".to_string(),
            });
        }

        let mut tx = self.pool.begin().await?;
        ensure_workshop(&mut tx, request.workshop_id).await?;

        Customers::new(&mut tx)
            .get_by_id(request.customer_id)
            .await?
            .filter(|c| c.workshop_id == request.workshop_id && c.is_active)
            .ok_or_else(|| Error::Validation {
                message: format!("Customer {} is not a customer of this workshop", request.customer_id),
            })?;
        Workers::new(&mut tx)
            .get_by_id(request.worker_id)
            .await?
            .filter(|w| w.workshop_id == request.workshop_id && w.is_active)
            .ok_or_else(|| Error::Validation {
                message: format!("Worker {} is not a worker of this workshop", request.worker_id),
            })?;

        let order = Orders::new(&mut tx).create(request).await?;
        tx.commit().await?;
        info!(number = %order.number, "Created order");

        self.notifier
            .dispatch(vec![NotificationEvent::OrderCreated { order_id: order.id }])
            .await;
        Ok(order)
    }

    pub async fn list_orders(&self, workshop_id: WorkshopId, skip: i64, limit: i64) -> Result<Vec<OrderDBResponse>> {
        let mut conn = self.pool.acquire().await?;
        ensure_workshop(&mut conn, workshop_id).await?;
        Ok(Orders::new(&mut conn).list(&OrderFilter::new(workshop_id, skip, limit)).await?)
    }

    /// Apply a partial update and notify on status and payment transitions
    #[instrument(skip(self, request), fields(workshop_id = %abbrev_uuid(&workshop_id), order_id = %abbrev_uuid(&order_id)), err)]
    pub async fn update_order(
        &self,
        workshop_id: WorkshopId,
        order_id: OrderId,
        request: &OrderUpdateDBRequest,
    ) -> Result<OrderDBResponse> {
        if request.status == Some(OrderStatus::Deleted) {
            return Err(Error::Validation {
                message: "Orders are deleted with DELETE, not by setting their status".to_string(),
            });
        }

        let mut tx = self.pool.begin().await?;
        let before = live_order(&mut tx, workshop_id, order_id).await?;

        if let Some(down_payment) = request.down_payment
            && (down_payment.is_sign_negative() || down_payment > before.amount)
        {
            return Err(Error::Validation {
                message: "Down payment must be between zero and the order amount".to_string(),
            });
        }
        if let Some(promised) = request.promised_delivery_date
            && promised < before.estimated_delivery_date
        {
            return Err(Error::Validation {
                message: "Promised delivery date cannot be before the estimated delivery date".to_string(),
            });
        }

        let after = Orders::new(&mut tx).update(order_id, request).await?;
        tx.commit().await?;

        self.notifier.dispatch(transition_events(&before, &after)).await;
        Ok(after)
    }

    #[instrument(skip(self), fields(workshop_id = %abbrev_uuid(&workshop_id), order_id = %abbrev_uuid(&order_id)), err)]
    pub async fn delete_order(&self, workshop_id: WorkshopId, order_id: OrderId) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        live_order(&mut tx, workshop_id, order_id).await?;
        Orders::new(&mut tx).delete(order_id).await?;
        tx.commit().await?;

        self.notifier
            .dispatch(vec![NotificationEvent::OrderUpdated {
                order_id,
                change: OrderChange::Deleted,
            }])
            .await;
        Ok(())
    }

    /// Group live orders of one workshop. Duplicate ids are collapsed.
    #[instrument(skip(self, request), fields(workshop_id = %abbrev_uuid(&request.workshop_id), orders = request.order_ids.len()), err)]
    pub async fn create_order_group(&self, request: &OrderGroupCreateDBRequest) -> Result<OrderGroupDBResponse> {
        let mut order_ids = Vec::with_capacity(request.order_ids.len());
        for id in &request.order_ids {
            if !order_ids.contains(id) {
                order_ids.push(*id);
            }
        }
        if order_ids.is_empty() {
            return Err(Error::Validation {
                message: "An order group needs at least one order".to_string(),
            });
        }

        let mut tx = self.pool.begin().await?;
        ensure_workshop(&mut tx, request.workshop_id).await?;

        let live = Orders::new(&mut tx).get_live_in_workshop(request.workshop_id, &order_ids).await?;
        if let Some(missing) = order_ids.iter().find(|id| !live.iter().any(|o| o.id == **id)) {
            return Err(Error::Validation {
                message: format!("Order {missing} is not a live order of this workshop"),
            });
        }

        let group = OrderGroups::new(&mut tx)
            .create(&OrderGroupCreateDBRequest {
                order_ids,
                ..request.clone()
            })
            .await?;
        tx.commit().await?;

        self.notifier
            .dispatch(vec![NotificationEvent::OrderGroupCreated { order_group_id: group.id }])
            .await;
        Ok(group)
    }

    /// Schedule the next fitting of a live order of the workshop
    #[instrument(skip(self, request), fields(workshop_id = %abbrev_uuid(&workshop_id), order_id = %abbrev_uuid(&request.order_id)), err)]
    pub async fn schedule_fitting(&self, workshop_id: WorkshopId, request: &FittingCreateDBRequest) -> Result<FittingDBResponse> {
        let mut tx = self.pool.begin().await?;
        let order = live_order(&mut tx, workshop_id, request.order_id).await?;
        if matches!(order.status, OrderStatus::Completed | OrderStatus::Cancelled) {
            return Err(Error::Validation {
                message: format!("Order '{}' is closed, fittings can no longer be scheduled", order.number),
            });
        }

        let fitting = Fittings::new(&mut tx).create(request).await?;
        tx.commit().await?;

        self.notifier
            .dispatch(vec![NotificationEvent::FittingScheduled { fitting_id: fitting.id }])
            .await;
        Ok(fitting)
    }

    pub async fn list_fittings(&self, workshop_id: WorkshopId, order_id: OrderId) -> Result<Vec<FittingDBResponse>> {
        let mut conn = self.pool.acquire().await?;
        live_order(&mut conn, workshop_id, order_id).await?;
        Ok(Fittings::new(&mut conn).list_for_order(order_id).await?)
    }
}
