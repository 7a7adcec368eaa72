//! Database models for workshop settings and capability grants.

use crate::packages::LimitProfile;
use crate::types::{Capability, PackageHistoryId, ResourceKind, WorkerId, WorkshopId};
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::FromRow;

/// Database response for a workshop's settings row
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct SettingDBResponse {
    pub workshop_id: WorkshopId,
    /// Ledger entry the ceilings were last derived from
    pub package_history_id: Option<PackageHistoryId>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub max_workers: i32,
    pub max_orders: i32,
    pub max_customers: i32,
    pub max_fittings: i32,
    pub max_order_groups: i32,
    pub max_order_ongoing_by_worker: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SettingDBResponse {
    /// The five tier-derived ceilings
    pub fn limits(&self) -> LimitProfile {
        LimitProfile {
            max_workers: self.max_workers,
            max_orders: self.max_orders,
            max_customers: self.max_customers,
            max_fittings: self.max_fittings,
            max_order_groups: self.max_order_groups,
        }
    }

    pub fn ceiling(&self, kind: ResourceKind) -> i32 {
        match kind {
            ResourceKind::Worker => self.max_workers,
            ResourceKind::Order => self.max_orders,
            ResourceKind::Customer => self.max_customers,
            ResourceKind::Fitting => self.max_fittings,
            ResourceKind::OrderGroup => self.max_order_groups,
        }
    }
}

/// Limits to write onto a settings row, together with their source
#[derive(Debug, Clone)]
pub struct SettingLimitsDBRequest {
    pub package_history_id: Option<PackageHistoryId>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub limits: LimitProfile,
}

/// Database request for editing the fields that are not derived from the tier
#[derive(Debug, Clone, Default)]
pub struct SettingUpdateDBRequest {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub max_order_ongoing_by_worker: Option<i32>,
}

/// Database response for one grant
#[derive(Debug, Clone, FromRow)]
pub struct AuthorizationDBResponse {
    pub workshop_id: WorkshopId,
    pub capability: Capability,
    pub worker_id: WorkerId,
    pub created_at: DateTime<Utc>,
}
