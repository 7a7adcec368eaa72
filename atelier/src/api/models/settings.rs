//! API models for settings, quota checks and capability grants.

use std::collections::BTreeMap;

use crate::db::models::settings::{SettingDBResponse, SettingUpdateDBRequest};
use crate::packages::LimitProfile;
use crate::services::quota::QuotaStatus;
use crate::types::{PackageHistoryId, ResourceKind, WorkerId, WorkshopId};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SettingResponse {
    #[schema(value_type = String, format = "uuid")]
    pub workshop_id: WorkshopId,
    /// Ledger entry the ceilings were derived from; null when on the DEMO fallback
    #[schema(value_type = Option<String>, format = "uuid")]
    pub package_history_id: Option<PackageHistoryId>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub limits: LimitProfile,
    pub max_order_ongoing_by_worker: i32,
    /// Grant sets keyed by capability name
    #[schema(value_type = BTreeMap<String, Vec<String>>)]
    pub authorizations: BTreeMap<String, Vec<WorkerId>>,
    pub updated_at: DateTime<Utc>,
}

impl SettingResponse {
    pub fn new(db: SettingDBResponse, authorizations: BTreeMap<String, Vec<WorkerId>>) -> Self {
        Self {
            limits: db.limits(),
            workshop_id: db.workshop_id,
            package_history_id: db.package_history_id,
            start_date: db.start_date,
            end_date: db.end_date,
            max_order_ongoing_by_worker: db.max_order_ongoing_by_worker,
            authorizations,
            updated_at: db.updated_at,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct SettingUpdate {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub max_order_ongoing_by_worker: Option<i32>,
}

impl From<SettingUpdate> for SettingUpdateDBRequest {
    fn from(api: SettingUpdate) -> Self {
        Self {
            start_date: api.start_date,
            end_date: api.end_date,
            max_order_ongoing_by_worker: api.max_order_ongoing_by_worker,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ReapplyResponse {
    pub changed: bool,
}

/// Answer to "is there room for one more"
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct QuotaResponse {
    pub kind: ResourceKind,
    /// True while the live count is below the ceiling
    pub exists: bool,
    pub used: i64,
    pub ceiling: i32,
}

impl From<QuotaStatus> for QuotaResponse {
    fn from(status: QuotaStatus) -> Self {
        Self {
            exists: status.has_room(),
            kind: status.kind,
            used: status.used,
            ceiling: status.ceiling,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AuthorizationStatus {
    pub authorized: bool,
}

/// Result of a grant or revoke; `changed` is false when membership was already as requested
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AuthorizationChange {
    pub changed: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AuthorizationSetUpdate {
    #[schema(value_type = Vec<String>)]
    pub worker_ids: Vec<WorkerId>,
}
