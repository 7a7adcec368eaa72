//! Business services.
//!
//! Services own transactions: each public operation begins a transaction on
//! the pool (or a savepoint on a caller's connection), composes repository
//! calls, commits, and only then dispatches notifications through the
//! [`crate::notifications::Notifier`].
//!
//! - [`ledger`]: tier assignment and the package history
//! - [`quota`]: settings, limit re-application, quota checks and capability grants
//! - [`access`]: read-only authorization facade used by the HTTP layer
//! - [`workshops`]: workshops, workers and customers
//! - [`orders`]: orders, order groups and fittings
//! - [`haberdashery`]: the supplies inventory and its worker set

pub mod access;
pub mod haberdashery;
pub mod ledger;
pub mod orders;
pub mod quota;
pub mod workshops;

use sqlx::PgConnection;

use crate::db::handlers::{Repository, Workshops};
use crate::db::models::workshops::WorkshopDBResponse;
use crate::errors::{Error, Result};
use crate::types::WorkshopId;

/// Load a workshop or fail with NotFound
pub(crate) async fn ensure_workshop(conn: &mut PgConnection, workshop_id: WorkshopId) -> Result<WorkshopDBResponse> {
    Workshops::new(conn)
        .get_by_id(workshop_id)
        .await?
        .ok_or_else(|| Error::not_found("Workshop", workshop_id))
}
