//! Database models for workers.

use crate::types::{UserId, WorkerId, WorkshopId};
use chrono::{DateTime, Utc};
use sqlx::FromRow;

/// Database request for adding a worker to a workshop
#[derive(Debug, Clone)]
pub struct WorkerCreateDBRequest {
    pub user_id: UserId,
    pub workshop_id: WorkshopId,
    pub is_owner: bool,
    pub is_allowed: bool,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
}

impl WorkerCreateDBRequest {
    /// A staff member with no special standing
    pub fn member(user_id: UserId, workshop_id: WorkshopId) -> Self {
        Self {
            user_id,
            workshop_id,
            is_owner: false,
            is_allowed: false,
            start_date: Some(Utc::now()),
            end_date: None,
        }
    }

    /// The owner of a newly created workshop
    pub fn owner(user_id: UserId, workshop_id: WorkshopId) -> Self {
        Self {
            is_owner: true,
            is_allowed: true,
            ..Self::member(user_id, workshop_id)
        }
    }
}

/// Database request for updating a worker
#[derive(Debug, Clone, Default)]
pub struct WorkerUpdateDBRequest {
    pub is_allowed: Option<bool>,
    pub end_date: Option<DateTime<Utc>>,
}

/// Database response for a worker
#[derive(Debug, Clone, FromRow)]
pub struct WorkerDBResponse {
    pub id: WorkerId,
    pub user_id: UserId,
    pub workshop_id: WorkshopId,
    pub is_owner: bool,
    pub is_active: bool,
    pub is_allowed: bool,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
