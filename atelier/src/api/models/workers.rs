//! API models for workers.

use crate::db::models::workers::WorkerDBResponse;
use crate::types::{UserId, WorkerId, WorkshopId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Add a worker by the email of their user; the user is created if unknown
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct WorkerCreate {
    pub email: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct WorkerResponse {
    #[schema(value_type = String, format = "uuid")]
    pub id: WorkerId,
    #[schema(value_type = String, format = "uuid")]
    pub user_id: UserId,
    #[schema(value_type = String, format = "uuid")]
    pub workshop_id: WorkshopId,
    pub is_owner: bool,
    pub is_active: bool,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
}

impl From<WorkerDBResponse> for WorkerResponse {
    fn from(db: WorkerDBResponse) -> Self {
        Self {
            id: db.id,
            user_id: db.user_id,
            workshop_id: db.workshop_id,
            is_owner: db.is_owner,
            is_active: db.is_active,
            start_date: db.start_date,
            end_date: db.end_date,
        }
    }
}
