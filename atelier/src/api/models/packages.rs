//! API models for the package catalog.

use crate::db::models::packages::PackageDBResponse;
use crate::packages::{LimitProfile, Tier};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PackageResponse {
    pub name: Tier,
    pub description: String,
    pub features: Vec<String>,
    #[schema(value_type = String)]
    pub price: Decimal,
    pub duration_days: i32,
    pub limits: LimitProfile,
}

impl From<PackageDBResponse> for PackageResponse {
    fn from(db: PackageDBResponse) -> Self {
        Self {
            limits: db.name.limit_profile(),
            name: db.name,
            description: db.description,
            features: db.features.0,
            price: db.price,
            duration_days: db.duration_days,
        }
    }
}
