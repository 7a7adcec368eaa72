//! Live entity counts used by quota checks.

use crate::db::errors::Result;
use crate::types::{ResourceKind, WorkshopId, abbrev_uuid};
use sqlx::PgConnection;
use tracing::instrument;

pub struct Usage<'c> {
    db: &'c mut PgConnection,
}

impl<'c> Usage<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    /// Number of live (not soft-deleted) entities of a kind in a workshop.
    ///
    /// A fitting is live only while its order is live too.
    #[instrument(skip(self), fields(workshop_id = %abbrev_uuid(&workshop_id), kind = %kind), err)]
    pub async fn count_live(&mut self, workshop_id: WorkshopId, kind: ResourceKind) -> Result<i64> {
        let sql = match kind {
            ResourceKind::Worker => "SELECT COUNT(*) FROM workers WHERE workshop_id = $1 AND is_active",
            ResourceKind::Customer => "SELECT COUNT(*) FROM customers WHERE workshop_id = $1 AND is_active",
            ResourceKind::Order => "SELECT COUNT(*) FROM orders WHERE workshop_id = $1 AND NOT is_deleted",
            ResourceKind::OrderGroup => "SELECT COUNT(*) FROM order_groups WHERE workshop_id = $1 AND NOT is_deleted",
            ResourceKind::Fitting => {
                r#"
                SELECT COUNT(*) FROM fittings f
                JOIN orders o ON o.id = f.order_id
                WHERE o.workshop_id = $1 AND NOT f.is_deleted AND NOT o.is_deleted
                "#
            }
        };

        let count: i64 = sqlx::query_scalar(sql).bind(workshop_id).fetch_one(&mut *self.db).await?;

        Ok(count)
    }
}
