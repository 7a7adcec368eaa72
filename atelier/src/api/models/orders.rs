//! API models for orders, order groups and fittings.

use crate::db::models::customers::Gender;
use crate::db::models::fittings::{FittingCreateDBRequest, FittingDBResponse, FittingStatus};
use crate::db::models::order_groups::OrderGroupDBResponse;
use crate::db::models::orders::{ClothingType, OrderCreateDBRequest, OrderDBResponse, OrderStatus, OrderUpdateDBRequest, PaymentStatus};
use crate::types::{CustomerId, FittingId, OrderGroupId, OrderId, WorkerId, WorkshopId};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct OrderCreate {
    #[schema(value_type = String, format = "uuid")]
    pub customer_id: CustomerId,
    /// Assigned worker; defaults to the worker making the request
    #[schema(value_type = Option<String>, format = "uuid")]
    pub worker_id: Option<WorkerId>,
    pub gender: Gender,
    pub type_of_clothing: ClothingType,
    pub description: Option<String>,
    pub clothing_model: String,
    #[schema(value_type = String)]
    pub amount: Decimal,
    #[schema(value_type = String)]
    #[serde(default)]
    pub down_payment: Decimal,
    #[serde(default)]
    pub is_urgent: bool,
    pub assign_date: Option<NaiveDate>,
    pub estimated_delivery_date: NaiveDate,
    pub promised_delivery_date: NaiveDate,
}

impl OrderCreate {
    pub fn into_db(self, workshop_id: WorkshopId, acting_worker: WorkerId) -> OrderCreateDBRequest {
        OrderCreateDBRequest {
            workshop_id,
            customer_id: self.customer_id,
            worker_id: self.worker_id.unwrap_or(acting_worker),
            gender: self.gender,
            type_of_clothing: self.type_of_clothing,
            description: self.description,
            clothing_model: self.clothing_model,
            amount: self.amount,
            down_payment: self.down_payment,
            is_urgent: self.is_urgent,
            assign_date: self.assign_date,
            estimated_delivery_date: self.estimated_delivery_date,
            promised_delivery_date: self.promised_delivery_date,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct OrderUpdate {
    pub status: Option<OrderStatus>,
    pub description: Option<String>,
    #[schema(value_type = Option<String>)]
    pub down_payment: Option<Decimal>,
    pub is_urgent: Option<bool>,
    pub promised_delivery_date: Option<NaiveDate>,
    pub actual_delivery_date: Option<NaiveDate>,
}

impl From<OrderUpdate> for OrderUpdateDBRequest {
    fn from(api: OrderUpdate) -> Self {
        Self {
            status: api.status,
            description: api.description,
            down_payment: api.down_payment,
            is_urgent: api.is_urgent,
            promised_delivery_date: api.promised_delivery_date,
            actual_delivery_date: api.actual_delivery_date,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct OrderResponse {
    #[schema(value_type = String, format = "uuid")]
    pub id: OrderId,
    pub number: String,
    #[schema(value_type = String, format = "uuid")]
    pub workshop_id: WorkshopId,
    #[schema(value_type = String, format = "uuid")]
    pub customer_id: CustomerId,
    #[schema(value_type = String, format = "uuid")]
    pub worker_id: WorkerId,
    pub gender: Gender,
    pub type_of_clothing: ClothingType,
    pub description: Option<String>,
    pub clothing_model: String,
    #[schema(value_type = String)]
    pub amount: Decimal,
    #[schema(value_type = String)]
    pub down_payment: Decimal,
    pub payment_status: PaymentStatus,
    pub status: OrderStatus,
    pub is_urgent: bool,
    pub assign_date: Option<NaiveDate>,
    pub estimated_delivery_date: NaiveDate,
    pub promised_delivery_date: NaiveDate,
    pub actual_delivery_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<OrderDBResponse> for OrderResponse {
    fn from(db: OrderDBResponse) -> Self {
        Self {
            id: db.id,
            number: db.number,
            workshop_id: db.workshop_id,
            customer_id: db.customer_id,
            worker_id: db.worker_id,
            gender: db.gender,
            type_of_clothing: db.type_of_clothing,
            description: db.description,
            clothing_model: db.clothing_model,
            amount: db.amount,
            down_payment: db.down_payment,
            payment_status: db.payment_status,
            status: db.status,
            is_urgent: db.is_urgent,
            assign_date: db.assign_date,
            estimated_delivery_date: db.estimated_delivery_date,
            promised_delivery_date: db.promised_delivery_date,
            actual_delivery_date: db.actual_delivery_date,
            created_at: db.created_at,
            updated_at: db.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct OrderGroupCreate {
    #[serde(default)]
    pub description: String,
    #[schema(value_type = Vec<String>)]
    pub order_ids: Vec<OrderId>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct OrderGroupResponse {
    #[schema(value_type = String, format = "uuid")]
    pub id: OrderGroupId,
    pub number: String,
    #[schema(value_type = String, format = "uuid")]
    pub workshop_id: WorkshopId,
    pub description: String,
    #[schema(value_type = String)]
    pub total_amount: Decimal,
    #[schema(value_type = Vec<String>)]
    pub order_ids: Vec<OrderId>,
    pub created_at: DateTime<Utc>,
}

impl From<OrderGroupDBResponse> for OrderGroupResponse {
    fn from(db: OrderGroupDBResponse) -> Self {
        Self {
            id: db.id,
            number: db.number,
            workshop_id: db.workshop_id,
            description: db.description,
            total_amount: db.total_amount,
            order_ids: db.order_ids,
            created_at: db.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct FittingCreate {
    #[schema(value_type = String, format = "uuid")]
    pub order_id: OrderId,
    pub scheduled_at: DateTime<Utc>,
    pub notes: Option<String>,
    pub adjustments_needed: Option<String>,
}

impl From<FittingCreate> for FittingCreateDBRequest {
    fn from(api: FittingCreate) -> Self {
        Self {
            order_id: api.order_id,
            scheduled_at: api.scheduled_at,
            notes: api.notes,
            adjustments_needed: api.adjustments_needed,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct FittingResponse {
    #[schema(value_type = String, format = "uuid")]
    pub id: FittingId,
    #[schema(value_type = String, format = "uuid")]
    pub order_id: OrderId,
    pub fitting_number: i32,
    pub scheduled_at: DateTime<Utc>,
    pub actual_at: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    pub adjustments_needed: Option<String>,
    pub status: FittingStatus,
}

impl From<FittingDBResponse> for FittingResponse {
    fn from(db: FittingDBResponse) -> Self {
        Self {
            id: db.id,
            order_id: db.order_id,
            fitting_number: db.fitting_number,
            scheduled_at: db.scheduled_at,
            actual_at: db.actual_at,
            notes: db.notes,
            adjustments_needed: db.adjustments_needed,
            status: db.status,
        }
    }
}
