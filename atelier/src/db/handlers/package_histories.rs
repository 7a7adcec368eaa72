//! Database repository for the package history ledger.
//!
//! The ledger is append-only apart from the `is_active` flag. The partial unique index
//! `package_histories_one_active_idx` allows one active entry per workshop, so callers must
//! [`PackageHistories::deactivate_all`] before [`PackageHistories::insert_active`] in the same
//! transaction.

use crate::db::{
    errors::Result,
    models::package_histories::{PackageHistoryCreateDBRequest, PackageHistoryDBResponse},
};
use crate::types::{WorkshopId, abbrev_uuid};
use sqlx::PgConnection;
use tracing::instrument;
use uuid::Uuid;

pub struct PackageHistories<'c> {
    db: &'c mut PgConnection,
}

impl<'c> PackageHistories<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    /// Mark every entry of the workshop inactive. Returns how many were active.
    #[instrument(skip(self), fields(workshop_id = %abbrev_uuid(&workshop_id)), err)]
    pub async fn deactivate_all(&mut self, workshop_id: WorkshopId) -> Result<u64> {
        let result = sqlx::query(
            "UPDATE package_histories SET is_active = FALSE, updated_at = NOW() WHERE workshop_id = $1 AND is_active",
        )
        .bind(workshop_id)
        .execute(&mut *self.db)
        .await?;

        Ok(result.rows_affected())
    }

    #[instrument(skip(self, request), fields(workshop_id = %abbrev_uuid(&request.workshop_id), tier = %request.name), err)]
    pub async fn insert_active(&mut self, request: &PackageHistoryCreateDBRequest) -> Result<PackageHistoryDBResponse> {
        let entry = sqlx::query_as::<_, PackageHistoryDBResponse>(
            r#"
            INSERT INTO package_histories (id, workshop_id, name, price, payment_info, is_active, start_date, end_date)
            VALUES ($1, $2, $3, $4, $5, TRUE, $6, $7)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(request.workshop_id)
        .bind(request.name)
        .bind(request.price)
        .bind(&request.payment_info)
        .bind(request.start_date)
        .bind(request.end_date)
        .fetch_one(&mut *self.db)
        .await?;

        Ok(entry)
    }

    #[instrument(skip(self), fields(workshop_id = %abbrev_uuid(&workshop_id)), err)]
    pub async fn get_active(&mut self, workshop_id: WorkshopId) -> Result<Option<PackageHistoryDBResponse>> {
        let entry = sqlx::query_as::<_, PackageHistoryDBResponse>(
            "SELECT * FROM package_histories WHERE workshop_id = $1 AND is_active",
        )
        .bind(workshop_id)
        .fetch_optional(&mut *self.db)
        .await?;

        Ok(entry)
    }

    /// Full history of a workshop, newest first
    #[instrument(skip(self), fields(workshop_id = %abbrev_uuid(&workshop_id)), err)]
    pub async fn list_for_workshop(&mut self, workshop_id: WorkshopId) -> Result<Vec<PackageHistoryDBResponse>> {
        let entries = sqlx::query_as::<_, PackageHistoryDBResponse>(
            "SELECT * FROM package_histories WHERE workshop_id = $1 ORDER BY created_at DESC, is_active DESC, start_date DESC",
        )
        .bind(workshop_id)
        .fetch_all(&mut *self.db)
        .await?;

        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::errors::DbError;
    use crate::packages::Tier;
    use crate::test_utils::create_test_workshop;
    use chrono::NaiveDate;
    use rust_decimal::Decimal;
    use sqlx::PgPool;

    fn entry(workshop_id: WorkshopId, name: Tier, start: NaiveDate) -> PackageHistoryCreateDBRequest {
        PackageHistoryCreateDBRequest {
            workshop_id,
            name,
            price: name.price(),
            payment_info: None,
            start_date: start,
            end_date: None,
        }
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_second_active_entry_requires_deactivation(pool: PgPool) {
        let workshop = create_test_workshop(&pool, "Atelier Ledger").await;
        let start = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();

        let mut tx = pool.begin().await.unwrap();
        let mut repo = PackageHistories::new(&mut tx);
        repo.insert_active(&entry(workshop.id, Tier::Demo, start)).await.unwrap();

        // Without deactivating first, the partial unique index rejects a second active row
        let err = repo
            .insert_active(&entry(workshop.id, Tier::Basic, start))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { .. }));
        assert_eq!(err.constraint(), Some("package_histories_one_active_idx"));
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_deactivate_then_insert(pool: PgPool) {
        let workshop = create_test_workshop(&pool, "Atelier Switch").await;
        let start = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();

        let mut conn = pool.acquire().await.unwrap();
        let mut repo = PackageHistories::new(&mut conn);
        let demo = repo.insert_active(&entry(workshop.id, Tier::Demo, start)).await.unwrap();
        assert_eq!(repo.deactivate_all(workshop.id).await.unwrap(), 1);

        let mut pro = entry(workshop.id, Tier::Pro, start);
        pro.price = Decimal::from(75_000);
        pro.payment_info = Some(serde_json::json!({"method": "mobile_money"}));
        let pro = repo.insert_active(&pro).await.unwrap();

        let active = repo.get_active(workshop.id).await.unwrap().unwrap();
        assert_eq!(active.id, pro.id);
        assert_eq!(active.price, Decimal::from(75_000));

        let history = repo.list_for_workshop(workshop.id).await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].id, pro.id);
        assert_eq!(history[1].id, demo.id);
        assert!(!history[1].is_active);
    }
}
