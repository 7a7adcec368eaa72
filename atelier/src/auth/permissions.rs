//! Workshop-scoped permission guards used by the HTTP handlers.
//!
//! Each guard either returns the acting worker or fails with [`Error::Forbidden`].
//! An unknown workshop is reported as `404` before membership is considered.

use tracing::debug;

use crate::AppState;
use crate::api::models::users::CurrentUser;
use crate::db::models::workers::WorkerDBResponse;
use crate::errors::{Error, Result};
use crate::types::{Capability, ResourceKind, WorkshopId, abbrev_uuid};

/// The caller's active worker record in the workshop.
pub async fn require_member(state: &AppState, workshop_id: WorkshopId, user: &CurrentUser) -> Result<WorkerDBResponse> {
    state.workshops.get_workshop(workshop_id).await?;
    state.access.membership(workshop_id, user.id).await?.ok_or_else(|| {
        debug!(workshop_id = %abbrev_uuid(&workshop_id), "Caller is not a worker of the workshop");
        Error::Forbidden {
            reason: "You are not a worker of this workshop".to_string(),
        }
    })
}

/// Owners pass; other workers need the capability grant.
pub async fn require_capability(
    state: &AppState,
    workshop_id: WorkshopId,
    user: &CurrentUser,
    capability: Capability,
) -> Result<WorkerDBResponse> {
    let worker = require_member(state, workshop_id, user).await?;
    if worker.is_owner || state.access.worker_can(workshop_id, worker.id, capability).await? {
        return Ok(worker);
    }
    Err(Error::Forbidden {
        reason: format!("You are not allowed to {}", capability.describe()),
    })
}

/// Owners pass; other workers need to be in the haberdashery's worker set.
pub async fn require_haberdasher(state: &AppState, workshop_id: WorkshopId, user: &CurrentUser) -> Result<WorkerDBResponse> {
    let worker = require_member(state, workshop_id, user).await?;
    if worker.is_owner || state.haberdashery.is_member(workshop_id, worker.id).await? {
        return Ok(worker);
    }
    Err(Error::Forbidden {
        reason: "You are not allowed to manage the haberdashery".to_string(),
    })
}

/// Fails once the live count of `kind` has reached its ceiling.
pub async fn require_room(state: &AppState, workshop_id: WorkshopId, kind: ResourceKind) -> Result<()> {
    if state.access.can_create(workshop_id, kind).await? {
        return Ok(());
    }
    Err(Error::Forbidden {
        reason: format!("The {kind} quota for this workshop's package has been reached"),
    })
}

/// Capability check followed by a quota check, in that order
pub async fn require_creation(
    state: &AppState,
    workshop_id: WorkshopId,
    user: &CurrentUser,
    kind: ResourceKind,
) -> Result<WorkerDBResponse> {
    let worker = require_capability(state, workshop_id, user, kind.required_capability()).await?;
    require_room(state, workshop_id, kind).await?;
    Ok(worker)
}
