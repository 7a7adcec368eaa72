//! Quota settings and capability grants.
//!
//! Every workshop has one settings row holding five ceilings derived from its
//! active package, plus five independent grant sets (one per [`Capability`]).
//! Quota checks compare a live count with a ceiling and are advisory: nothing
//! here rejects a creation, and two concurrent creators can both see room for
//! the last slot.

use std::collections::BTreeMap;

use serde::Serialize;
use sqlx::{PgConnection, PgPool};
use tracing::{info, instrument, warn};
use utoipa::ToSchema;

use crate::db::handlers::{PackageHistories, Settings, Usage, Workers};
use crate::db::models::settings::{SettingDBResponse, SettingLimitsDBRequest, SettingUpdateDBRequest};
use crate::errors::{Error, Result};
use crate::notifications::{NotificationEvent, Notifier};
use crate::packages::Tier;
use crate::services::{ensure_workshop, haberdashery};
use crate::types::{Capability, ResourceKind, WorkerId, WorkshopId, abbrev_uuid};

/// Usage of one resource kind against its ceiling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub struct QuotaStatus {
    pub kind: ResourceKind,
    pub used: i64,
    pub ceiling: i32,
}

impl QuotaStatus {
    /// Whether one more entity fits under the ceiling
    pub fn has_room(&self) -> bool {
        self.used < i64::from(self.ceiling)
    }
}

/// Membership changes applied by [`QuotaService::set_authorizations`]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AuthorizationDiff {
    pub added: Vec<WorkerId>,
    pub removed: Vec<WorkerId>,
}

/// Re-derive the settings ceilings from the active ledger entry, falling back to DEMO.
///
/// Runs on the caller's connection (normally inside a transaction) and locks the settings row.
/// Returns whether the row changed.
pub(crate) async fn apply_active_limits(conn: &mut PgConnection, workshop_id: WorkshopId) -> Result<bool> {
    let setting = Settings::new(&mut *conn)
        .get_for_update(workshop_id)
        .await?
        .ok_or_else(|| Error::not_found("Settings for workshop", workshop_id))?;

    let request = match PackageHistories::new(&mut *conn).get_active(workshop_id).await? {
        Some(entry) => SettingLimitsDBRequest {
            package_history_id: Some(entry.id),
            start_date: Some(entry.start_date),
            end_date: entry.end_date,
            limits: entry.name.limit_profile(),
        },
        None => {
            warn!(workshop_id = %abbrev_uuid(&workshop_id), "No active package, applying DEMO limits");
            SettingLimitsDBRequest {
                package_history_id: None,
                start_date: setting.start_date,
                end_date: setting.end_date,
                limits: Tier::Demo.limit_profile(),
            }
        }
    };

    Ok(Settings::new(conn).write_limits(workshop_id, &request).await?)
}

/// Create the settings row, and the haberdashery that comes with it, when missing.
/// Returns whether the settings row was created.
pub(crate) async fn ensure_settings(conn: &mut PgConnection, workshop_id: WorkshopId) -> Result<bool> {
    let created = Settings::new(&mut *conn).create_if_missing(workshop_id).await?;
    haberdashery::ensure_haberdashery(conn, workshop_id).await?;
    Ok(created)
}

/// Reject any worker that is not a member of the workshop
pub(crate) async fn ensure_same_tenant(conn: &mut PgConnection, workshop_id: WorkshopId, worker_ids: &[WorkerId]) -> Result<()> {
    let foreign = Workers::new(conn).foreign_to_workshop(workshop_id, worker_ids).await?;
    if let Some(worker_id) = foreign.first() {
        return Err(Error::Validation {
            message: format!("Worker {worker_id} does not belong to workshop {workshop_id}"),
        });
    }
    Ok(())
}

#[derive(Clone)]
pub struct QuotaService {
    pool: PgPool,
    notifier: Notifier,
}

impl QuotaService {
    pub fn new(pool: PgPool, notifier: Notifier) -> Self {
        Self { pool, notifier }
    }

    /// The workshop's settings, created with DEMO defaults if missing
    #[instrument(skip(self), fields(workshop_id = %abbrev_uuid(&workshop_id)), err)]
    pub async fn get_or_create(&self, workshop_id: WorkshopId) -> Result<SettingDBResponse> {
        let mut tx = self.pool.begin().await?;
        ensure_workshop(&mut tx, workshop_id).await?;

        if ensure_settings(&mut tx, workshop_id).await? {
            info!("Created default settings");
        }
        let setting = Settings::new(&mut tx)
            .get(workshop_id)
            .await?
            .ok_or_else(|| Error::not_found("Settings for workshop", workshop_id))?;

        tx.commit().await?;
        Ok(setting)
    }

    /// Overwrite the five ceilings with the active tier's profile. Returns whether anything changed.
    #[instrument(skip(self), fields(workshop_id = %abbrev_uuid(&workshop_id)), err)]
    pub async fn reapply_limits(&self, workshop_id: WorkshopId) -> Result<bool> {
        let mut tx = self.pool.begin().await?;
        ensure_workshop(&mut tx, workshop_id).await?;
        ensure_settings(&mut tx, workshop_id).await?;
        let changed = apply_active_limits(&mut tx, workshop_id).await?;
        tx.commit().await?;
        Ok(changed)
    }

    /// Live count and ceiling for one resource kind
    #[instrument(skip(self), fields(workshop_id = %abbrev_uuid(&workshop_id), kind = %kind), err)]
    pub async fn quota_status(&self, workshop_id: WorkshopId, kind: ResourceKind) -> Result<QuotaStatus> {
        let mut conn = self.pool.acquire().await?;
        let setting = Settings::new(&mut conn)
            .get(workshop_id)
            .await?
            .ok_or_else(|| Error::not_found("Settings for workshop", workshop_id))?;
        let used = Usage::new(&mut conn).count_live(workshop_id, kind).await?;

        Ok(QuotaStatus {
            kind,
            used,
            ceiling: setting.ceiling(kind),
        })
    }

    /// True while the live count of `kind` is below its ceiling.
    ///
    /// Not isolated from concurrent creations, so the ceiling is a soft limit.
    pub async fn check_quota(&self, workshop_id: WorkshopId, kind: ResourceKind) -> Result<bool> {
        Ok(self.quota_status(workshop_id, kind).await?.has_room())
    }

    /// Add a worker to a grant set. Returns true, and notifies the worker, only if it was not already a member.
    #[instrument(skip(self), fields(workshop_id = %abbrev_uuid(&workshop_id), worker_id = %abbrev_uuid(&worker_id), capability = %capability), err)]
    pub async fn grant_authorization(&self, workshop_id: WorkshopId, worker_id: WorkerId, capability: Capability) -> Result<bool> {
        let mut tx = self.pool.begin().await?;
        ensure_workshop(&mut tx, workshop_id).await?;
        ensure_same_tenant(&mut tx, workshop_id, &[worker_id]).await?;

        ensure_settings(&mut tx, workshop_id).await?;
        let mut settings = Settings::new(&mut tx);
        let added = settings.add_grant(workshop_id, capability, worker_id).await?;
        tx.commit().await?;

        if added {
            self.notifier
                .dispatch(vec![NotificationEvent::AuthorizationGranted {
                    workshop_id,
                    worker_id,
                    capability,
                }])
                .await;
        }
        Ok(added)
    }

    /// Remove a worker from a grant set. Returns true, and notifies the worker, only if it was a member.
    #[instrument(skip(self), fields(workshop_id = %abbrev_uuid(&workshop_id), worker_id = %abbrev_uuid(&worker_id), capability = %capability), err)]
    pub async fn revoke_authorization(&self, workshop_id: WorkshopId, worker_id: WorkerId, capability: Capability) -> Result<bool> {
        let mut tx = self.pool.begin().await?;
        ensure_workshop(&mut tx, workshop_id).await?;
        ensure_same_tenant(&mut tx, workshop_id, &[worker_id]).await?;

        let removed = Settings::new(&mut tx).remove_grant(workshop_id, capability, worker_id).await?;
        tx.commit().await?;

        if removed {
            self.notifier
                .dispatch(vec![NotificationEvent::AuthorizationRevoked {
                    workshop_id,
                    worker_id,
                    capability,
                }])
                .await;
        }
        Ok(removed)
    }

    /// Replace a whole grant set. All workers are validated before anything changes; each
    /// worker that joins or leaves the set is notified.
    #[instrument(skip(self, worker_ids), fields(workshop_id = %abbrev_uuid(&workshop_id), capability = %capability, count = worker_ids.len()), err)]
    pub async fn set_authorizations(
        &self,
        workshop_id: WorkshopId,
        capability: Capability,
        worker_ids: &[WorkerId],
    ) -> Result<AuthorizationDiff> {
        let mut tx = self.pool.begin().await?;
        ensure_workshop(&mut tx, workshop_id).await?;
        ensure_same_tenant(&mut tx, workshop_id, worker_ids).await?;

        ensure_settings(&mut tx, workshop_id).await?;
        let mut settings = Settings::new(&mut tx);
        let current = settings.list_grant_set(workshop_id, capability).await?;

        let mut diff = AuthorizationDiff::default();
        for worker_id in worker_ids {
            if !current.contains(worker_id) && !diff.added.contains(worker_id) {
                settings.add_grant(workshop_id, capability, *worker_id).await?;
                diff.added.push(*worker_id);
            }
        }
        for worker_id in &current {
            if !worker_ids.contains(worker_id) {
                settings.remove_grant(workshop_id, capability, *worker_id).await?;
                diff.removed.push(*worker_id);
            }
        }
        tx.commit().await?;

        let events = diff
            .added
            .iter()
            .map(|&worker_id| NotificationEvent::AuthorizationGranted {
                workshop_id,
                worker_id,
                capability,
            })
            .chain(diff.removed.iter().map(|&worker_id| NotificationEvent::AuthorizationRevoked {
                workshop_id,
                worker_id,
                capability,
            }))
            .collect();
        self.notifier.dispatch(events).await;

        Ok(diff)
    }

    /// Whether the worker is in the capability's grant set
    pub async fn is_authorized(&self, workshop_id: WorkshopId, worker_id: WorkerId, capability: Capability) -> Result<bool> {
        let mut conn = self.pool.acquire().await?;
        Ok(Settings::new(&mut conn).is_granted(workshop_id, capability, worker_id).await?)
    }

    /// All five grant sets, keyed by capability. Empty sets are included.
    #[instrument(skip(self), fields(workshop_id = %abbrev_uuid(&workshop_id)), err)]
    pub async fn list_authorizations(&self, workshop_id: WorkshopId) -> Result<BTreeMap<String, Vec<WorkerId>>> {
        let mut conn = self.pool.acquire().await?;
        let grants = Settings::new(&mut conn).list_grants(workshop_id).await?;

        let mut sets: BTreeMap<String, Vec<WorkerId>> =
            Capability::ALL.iter().map(|c| (c.as_str().to_string(), Vec::new())).collect();
        for grant in grants {
            sets.entry(grant.capability.as_str().to_string()).or_default().push(grant.worker_id);
        }
        Ok(sets)
    }

    /// Edit the fields that are not derived from the package
    #[instrument(skip(self, request), fields(workshop_id = %abbrev_uuid(&workshop_id)), err)]
    pub async fn update_settings(&self, workshop_id: WorkshopId, request: &SettingUpdateDBRequest) -> Result<SettingDBResponse> {
        if let Some(limit) = request.max_order_ongoing_by_worker
            && limit <= 0
        {
            return Err(Error::Validation {
                message: "max_order_ongoing_by_worker must be positive".to_string(),
            });
        }

        let mut tx = self.pool.begin().await?;
        ensure_workshop(&mut tx, workshop_id).await?;
        ensure_settings(&mut tx, workshop_id).await?;
        let mut settings = Settings::new(&mut tx);
        let updated = settings.update(workshop_id, request).await?;

        if let (Some(start), Some(end)) = (updated.start_date, updated.end_date)
            && end < start
        {
            return Err(Error::Validation {
                message: "Settings end date cannot be before the start date".to_string(),
            });
        }

        tx.commit().await?;
        Ok(updated)
    }
}
