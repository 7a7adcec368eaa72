//! Database models for orders.

use crate::db::models::customers::Gender;
use crate::types::{CustomerId, OrderId, WorkerId, WorkshopId};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "text", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum ClothingType {
    Shirt,
    Pants,
    Dress,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "text", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    New,
    InProgress,
    Completed,
    Cancelled,
    Deleted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "text", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum PaymentStatus {
    Pending,
    Partial,
    Paid,
}

impl PaymentStatus {
    /// Payment status follows from how much of the amount has been paid up front
    pub fn from_amounts(amount: Decimal, down_payment: Decimal) -> Self {
        if down_payment.is_zero() {
            PaymentStatus::Pending
        } else if down_payment < amount {
            PaymentStatus::Partial
        } else {
            PaymentStatus::Paid
        }
    }
}

/// Database request for creating an order. Number and payment status are
/// computed by the repository.
#[derive(Debug, Clone)]
pub struct OrderCreateDBRequest {
    pub workshop_id: WorkshopId,
    pub customer_id: CustomerId,
    pub worker_id: WorkerId,
    pub gender: Gender,
    pub type_of_clothing: ClothingType,
    pub description: Option<String>,
    pub clothing_model: String,
    pub amount: Decimal,
    pub down_payment: Decimal,
    pub is_urgent: bool,
    pub assign_date: Option<NaiveDate>,
    pub estimated_delivery_date: NaiveDate,
    pub promised_delivery_date: NaiveDate,
}

/// Database request for updating an order
#[derive(Debug, Clone, Default)]
pub struct OrderUpdateDBRequest {
    pub status: Option<OrderStatus>,
    pub description: Option<String>,
    pub down_payment: Option<Decimal>,
    pub is_urgent: Option<bool>,
    pub promised_delivery_date: Option<NaiveDate>,
    pub actual_delivery_date: Option<NaiveDate>,
}

/// Database response for an order
#[derive(Debug, Clone, FromRow)]
pub struct OrderDBResponse {
    pub id: OrderId,
    pub number: String,
    pub workshop_id: WorkshopId,
    pub customer_id: CustomerId,
    pub worker_id: WorkerId,
    pub gender: Gender,
    pub type_of_clothing: ClothingType,
    pub description: Option<String>,
    pub clothing_model: String,
    pub amount: Decimal,
    pub down_payment: Decimal,
    pub payment_status: PaymentStatus,
    pub status: OrderStatus,
    pub is_urgent: bool,
    pub assign_date: Option<NaiveDate>,
    pub estimated_delivery_date: NaiveDate,
    pub promised_delivery_date: NaiveDate,
    pub actual_delivery_date: Option<NaiveDate>,
    pub is_deleted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
