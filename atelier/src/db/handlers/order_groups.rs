//! Database repository for order groups.

use crate::db::{
    errors::Result,
    handlers::orders::generate_number,
    models::order_groups::{OrderGroupCreateDBRequest, OrderGroupDBResponse},
};
use crate::types::{OrderGroupId, OrderId, WorkshopId, abbrev_uuid};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{Connection, FromRow, PgConnection};
use tracing::instrument;
use uuid::Uuid;

#[derive(Debug, Clone, FromRow)]
struct OrderGroup {
    pub id: OrderGroupId,
    pub number: String,
    pub workshop_id: WorkshopId,
    pub description: String,
    pub total_amount: Decimal,
    pub is_deleted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl OrderGroup {
    fn into_response(self, order_ids: Vec<OrderId>) -> OrderGroupDBResponse {
        OrderGroupDBResponse {
            id: self.id,
            number: self.number,
            workshop_id: self.workshop_id,
            description: self.description,
            total_amount: self.total_amount,
            order_ids,
            is_deleted: self.is_deleted,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

pub struct OrderGroups<'c> {
    db: &'c mut PgConnection,
}

impl<'c> OrderGroups<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    /// Create the group and its memberships. The total is the sum of the member orders' amounts.
    ///
    /// Orders are expected to have been validated as live orders of the same workshop.
    #[instrument(skip(self, request), fields(workshop_id = %abbrev_uuid(&request.workshop_id), orders = request.order_ids.len()), err)]
    pub async fn create(&mut self, request: &OrderGroupCreateDBRequest) -> Result<OrderGroupDBResponse> {
        let mut tx = self.db.begin().await?;

        let total: Option<Decimal> = sqlx::query_scalar("SELECT SUM(amount) FROM orders WHERE id = ANY($1)")
            .bind(&request.order_ids)
            .fetch_one(&mut *tx)
            .await?;

        let group = sqlx::query_as::<_, OrderGroup>(
            r#"
            INSERT INTO order_groups (id, number, workshop_id, description, total_amount)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(generate_number("GRP"))
        .bind(request.workshop_id)
        .bind(&request.description)
        .bind(total.unwrap_or(Decimal::ZERO))
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            INSERT INTO order_group_orders (order_group_id, order_id)
            SELECT $1, UNNEST($2::uuid[])
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(group.id)
        .bind(&request.order_ids)
        .execute(&mut *tx)
        .await?;

        let order_ids = Self::member_ids(&mut tx, group.id).await?;
        tx.commit().await?;

        Ok(group.into_response(order_ids))
    }

    #[instrument(skip(self), fields(order_group_id = %abbrev_uuid(&id)), err)]
    pub async fn get_by_id(&mut self, id: OrderGroupId) -> Result<Option<OrderGroupDBResponse>> {
        let Some(group) = sqlx::query_as::<_, OrderGroup>("SELECT * FROM order_groups WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *self.db)
            .await?
        else {
            return Ok(None);
        };

        let order_ids = Self::member_ids(&mut *self.db, id).await?;
        Ok(Some(group.into_response(order_ids)))
    }

    /// Soft delete
    #[instrument(skip(self), fields(order_group_id = %abbrev_uuid(&id)), err)]
    pub async fn delete(&mut self, id: OrderGroupId) -> Result<bool> {
        let result = sqlx::query("UPDATE order_groups SET is_deleted = TRUE, updated_at = NOW() WHERE id = $1 AND NOT is_deleted")
            .bind(id)
            .execute(&mut *self.db)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn member_ids(conn: &mut PgConnection, id: OrderGroupId) -> Result<Vec<OrderId>> {
        let ids: Vec<Uuid> = sqlx::query_scalar("SELECT order_id FROM order_group_orders WHERE order_group_id = $1 ORDER BY order_id")
            .bind(id)
            .fetch_all(conn)
            .await?;

        Ok(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::handlers::{Orders, Repository};
    use crate::test_utils::{OrderFixture, create_order_fixture};
    use sqlx::PgPool;

    #[sqlx::test]
    #[test_log::test]
    async fn test_total_is_sum_of_members(pool: PgPool) {
        let OrderFixture { request, .. } = create_order_fixture(&pool).await;
        let mut conn = pool.acquire().await.unwrap();

        let mut orders = Orders::new(&mut conn);
        let first = orders.create(&request).await.unwrap();
        let second = orders.create(&request).await.unwrap();

        let mut repo = OrderGroups::new(&mut conn);
        let group = repo
            .create(&OrderGroupCreateDBRequest {
                workshop_id: request.workshop_id,
                description: "Wedding party".to_string(),
                order_ids: vec![first.id, second.id],
            })
            .await
            .unwrap();

        assert_eq!(group.total_amount, first.amount + second.amount);
        assert_eq!(group.order_ids.len(), 2);
        assert!(group.number.starts_with("GRP-"));

        let fetched = repo.get_by_id(group.id).await.unwrap().unwrap();
        assert_eq!(fetched.order_ids, group.order_ids);

        assert!(repo.delete(group.id).await.unwrap());
        assert!(repo.get_by_id(group.id).await.unwrap().unwrap().is_deleted);
    }
}
