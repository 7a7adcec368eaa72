//! Database repository for fittings.

use crate::db::{
    errors::Result,
    models::fittings::{FittingCreateDBRequest, FittingDBResponse},
};
use crate::types::{FittingId, OrderId, abbrev_uuid};
use sqlx::PgConnection;
use tracing::instrument;
use uuid::Uuid;

pub struct Fittings<'c> {
    db: &'c mut PgConnection,
}

impl<'c> Fittings<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    /// Schedule the next fitting of an order. Numbers start at 1 and count deleted fittings too.
    #[instrument(skip(self, request), fields(order_id = %abbrev_uuid(&request.order_id)), err)]
    pub async fn create(&mut self, request: &FittingCreateDBRequest) -> Result<FittingDBResponse> {
        let fitting = sqlx::query_as::<_, FittingDBResponse>(
            r#"
            INSERT INTO fittings (id, order_id, fitting_number, scheduled_at, notes, adjustments_needed)
            SELECT $1, $2, COALESCE(MAX(fitting_number), 0) + 1, $3, $4, $5
            FROM fittings WHERE order_id = $2
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(request.order_id)
        .bind(request.scheduled_at)
        .bind(&request.notes)
        .bind(&request.adjustments_needed)
        .fetch_one(&mut *self.db)
        .await?;

        Ok(fitting)
    }

    #[instrument(skip(self), fields(fitting_id = %abbrev_uuid(&id)), err)]
    pub async fn get_by_id(&mut self, id: FittingId) -> Result<Option<FittingDBResponse>> {
        let fitting = sqlx::query_as::<_, FittingDBResponse>("SELECT * FROM fittings WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *self.db)
            .await?;

        Ok(fitting)
    }

    #[instrument(skip(self), fields(order_id = %abbrev_uuid(&order_id)), err)]
    pub async fn list_for_order(&mut self, order_id: OrderId) -> Result<Vec<FittingDBResponse>> {
        let fittings = sqlx::query_as::<_, FittingDBResponse>(
            "SELECT * FROM fittings WHERE order_id = $1 AND NOT is_deleted ORDER BY fitting_number",
        )
        .bind(order_id)
        .fetch_all(&mut *self.db)
        .await?;

        Ok(fittings)
    }

    /// Soft delete
    #[instrument(skip(self), fields(fitting_id = %abbrev_uuid(&id)), err)]
    pub async fn delete(&mut self, id: FittingId) -> Result<bool> {
        let result = sqlx::query("UPDATE fittings SET is_deleted = TRUE, updated_at = NOW() WHERE id = $1 AND NOT is_deleted")
            .bind(id)
            .execute(&mut *self.db)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::handlers::{Orders, Repository};
    use crate::db::models::fittings::FittingStatus;
    use crate::test_utils::{OrderFixture, create_order_fixture};
    use chrono::Utc;
    use sqlx::PgPool;

    #[sqlx::test]
    #[test_log::test]
    async fn test_fitting_numbers_increment_per_order(pool: PgPool) {
        let OrderFixture { request, .. } = create_order_fixture(&pool).await;
        let mut conn = pool.acquire().await.unwrap();
        let mut orders = Orders::new(&mut conn);
        let order = orders.create(&request).await.unwrap();
        let other = orders.create(&request).await.unwrap();

        let mut repo = Fittings::new(&mut conn);
        let schedule = |order_id| FittingCreateDBRequest {
            order_id,
            scheduled_at: Utc::now(),
            notes: None,
            adjustments_needed: None,
        };

        let first = repo.create(&schedule(order.id)).await.unwrap();
        let second = repo.create(&schedule(order.id)).await.unwrap();
        let elsewhere = repo.create(&schedule(other.id)).await.unwrap();
        assert_eq!(first.fitting_number, 1);
        assert_eq!(second.fitting_number, 2);
        assert_eq!(elsewhere.fitting_number, 1);
        assert_eq!(first.status, FittingStatus::Scheduled);

        // Deleted fittings keep their number
        assert!(repo.delete(second.id).await.unwrap());
        let third = repo.create(&schedule(order.id)).await.unwrap();
        assert_eq!(third.fitting_number, 3);

        let live: Vec<i32> = repo
            .list_for_order(order.id)
            .await
            .unwrap()
            .iter()
            .map(|f| f.fitting_number)
            .collect();
        assert_eq!(live, vec![1, 3]);
    }
}
