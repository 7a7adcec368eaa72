//! Database models for the package history ledger.

use crate::packages::Tier;
use crate::types::{PackageHistoryId, WorkshopId};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::FromRow;

/// Database request for appending a ledger entry. The new entry is always
/// inserted as the active one.
#[derive(Debug, Clone)]
pub struct PackageHistoryCreateDBRequest {
    pub workshop_id: WorkshopId,
    pub name: Tier,
    pub price: Decimal,
    pub payment_info: Option<serde_json::Value>,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
}

/// Database response for a ledger entry
#[derive(Debug, Clone, FromRow)]
pub struct PackageHistoryDBResponse {
    pub id: PackageHistoryId,
    pub workshop_id: WorkshopId,
    pub name: Tier,
    pub price: Decimal,
    pub payment_info: Option<serde_json::Value>,
    pub is_active: bool,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
