//! API models for the package history ledger.

use crate::db::models::package_histories::PackageHistoryDBResponse;
use crate::packages::Tier;
use crate::types::{PackageHistoryId, WorkshopId};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TierAssign {
    pub tier: Tier,
    /// Price snapshot; the catalog price when omitted
    #[schema(value_type = Option<String>)]
    pub price: Option<Decimal>,
    pub payment_info: Option<serde_json::Value>,
    /// Defaults to today
    pub start_date: Option<NaiveDate>,
    /// Defaults to the start date plus the tier's duration
    pub end_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PackageHistoryResponse {
    #[schema(value_type = String, format = "uuid")]
    pub id: PackageHistoryId,
    #[schema(value_type = String, format = "uuid")]
    pub workshop_id: WorkshopId,
    pub name: Tier,
    #[schema(value_type = String)]
    pub price: Decimal,
    pub payment_info: Option<serde_json::Value>,
    pub is_active: bool,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
}

impl From<PackageHistoryDBResponse> for PackageHistoryResponse {
    fn from(db: PackageHistoryDBResponse) -> Self {
        Self {
            id: db.id,
            workshop_id: db.workshop_id,
            name: db.name,
            price: db.price,
            payment_info: db.payment_info,
            is_active: db.is_active,
            start_date: db.start_date,
            end_date: db.end_date,
            created_at: db.created_at,
        }
    }
}
