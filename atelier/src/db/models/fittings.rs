//! Database models for fittings.

use crate::types::{FittingId, OrderId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "text", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FittingStatus {
    Scheduled,
    Completed,
    Cancelled,
    NeedsMajorAdjustments,
}

/// Database request for scheduling a fitting. The fitting number is the next
/// one for the order.
#[derive(Debug, Clone)]
pub struct FittingCreateDBRequest {
    pub order_id: OrderId,
    pub scheduled_at: DateTime<Utc>,
    pub notes: Option<String>,
    pub adjustments_needed: Option<String>,
}

/// Database response for a fitting
#[derive(Debug, Clone, FromRow)]
pub struct FittingDBResponse {
    pub id: FittingId,
    pub order_id: OrderId,
    pub fitting_number: i32,
    pub scheduled_at: DateTime<Utc>,
    pub actual_at: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    pub adjustments_needed: Option<String>,
    pub status: FittingStatus,
    pub is_deleted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
