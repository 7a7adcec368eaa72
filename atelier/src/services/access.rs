//! Read-only authorization checks.
//!
//! Thin façade over [`QuotaService`] and the worker directory answering the two
//! questions the HTTP layer asks before a creation: is there room, and is this
//! worker allowed. Nothing here writes, and nothing here raises "quota reached";
//! turning a `false` into a 403 is the caller's decision.

use sqlx::PgPool;
use tracing::{debug, instrument};

use crate::db::handlers::{Settings, Workers};
use crate::db::models::workers::WorkerDBResponse;
use crate::errors::Result;
use crate::services::quota::QuotaService;
use crate::types::{Capability, ResourceKind, UserId, WorkerId, WorkshopId, abbrev_uuid};

#[derive(Clone)]
pub struct AccessCheck {
    pool: PgPool,
    quota: QuotaService,
}

impl AccessCheck {
    pub fn new(pool: PgPool, quota: QuotaService) -> Self {
        Self { pool, quota }
    }

    /// Whether one more entity of `kind` fits under the workshop's ceiling
    pub async fn can_create(&self, workshop_id: WorkshopId, kind: ResourceKind) -> Result<bool> {
        self.quota.check_quota(workshop_id, kind).await
    }

    /// Whether the worker holds the capability grant
    pub async fn worker_can(&self, workshop_id: WorkshopId, worker_id: WorkerId, capability: Capability) -> Result<bool> {
        self.quota.is_authorized(workshop_id, worker_id, capability).await
    }

    /// The user's active worker record in the workshop, if any
    pub async fn membership(&self, workshop_id: WorkshopId, user_id: UserId) -> Result<Option<WorkerDBResponse>> {
        let mut conn = self.pool.acquire().await?;
        Ok(Workers::new(&mut conn).get_active_membership(workshop_id, user_id).await?)
    }

    /// Owners may do anything in their workshop; other active workers need the grant.
    #[instrument(skip(self), fields(workshop_id = %abbrev_uuid(&workshop_id), user_id = %abbrev_uuid(&user_id), capability = %capability), err)]
    pub async fn owner_or_granted(&self, workshop_id: WorkshopId, user_id: UserId, capability: Capability) -> Result<bool> {
        let mut conn = self.pool.acquire().await?;
        let Some(worker) = Workers::new(&mut conn).get_active_membership(workshop_id, user_id).await? else {
            debug!("User is not an active worker of the workshop");
            return Ok(false);
        };
        if worker.is_owner {
            return Ok(true);
        }
        Ok(Settings::new(&mut conn).is_granted(workshop_id, capability, worker.id).await?)
    }
}
