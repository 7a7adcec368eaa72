//! Database models for order groups.

use crate::types::{OrderGroupId, OrderId, WorkshopId};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

/// Database request for grouping existing orders of one workshop
#[derive(Debug, Clone)]
pub struct OrderGroupCreateDBRequest {
    pub workshop_id: WorkshopId,
    pub description: String,
    pub order_ids: Vec<OrderId>,
}

/// Database response for an order group
#[derive(Debug, Clone)]
pub struct OrderGroupDBResponse {
    pub id: OrderGroupId,
    pub number: String,
    pub workshop_id: WorkshopId,
    pub description: String,
    /// Sum of the member orders' amounts at grouping time
    pub total_amount: Decimal,
    pub order_ids: Vec<OrderId>,
    pub is_deleted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
