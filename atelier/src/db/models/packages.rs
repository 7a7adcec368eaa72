//! Database models for the seeded package catalog.

use crate::packages::Tier;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::FromRow;
use sqlx::types::Json;

/// Database response for a catalog row
#[derive(Debug, Clone, FromRow)]
pub struct PackageDBResponse {
    pub name: Tier,
    pub description: String,
    pub features: Json<Vec<String>>,
    pub price: Decimal,
    pub duration_days: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
