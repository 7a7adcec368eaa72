//! Database repository for workshop settings and the capability grant sets.

use crate::db::{
    errors::{DbError, Result},
    models::settings::{AuthorizationDBResponse, SettingDBResponse, SettingLimitsDBRequest, SettingUpdateDBRequest},
};
use crate::types::{Capability, WorkerId, WorkshopId, abbrev_uuid};
use sqlx::PgConnection;
use tracing::instrument;
use uuid::Uuid;

pub struct Settings<'c> {
    db: &'c mut PgConnection,
}

impl<'c> Settings<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    #[instrument(skip(self), fields(workshop_id = %abbrev_uuid(&workshop_id)), err)]
    pub async fn get(&mut self, workshop_id: WorkshopId) -> Result<Option<SettingDBResponse>> {
        let setting = sqlx::query_as::<_, SettingDBResponse>("SELECT * FROM settings WHERE workshop_id = $1")
            .bind(workshop_id)
            .fetch_optional(&mut *self.db)
            .await?;

        Ok(setting)
    }

    /// Read the row and hold its lock until the surrounding transaction ends
    #[instrument(skip(self), fields(workshop_id = %abbrev_uuid(&workshop_id)), err)]
    pub async fn get_for_update(&mut self, workshop_id: WorkshopId) -> Result<Option<SettingDBResponse>> {
        let setting = sqlx::query_as::<_, SettingDBResponse>("SELECT * FROM settings WHERE workshop_id = $1 FOR UPDATE")
            .bind(workshop_id)
            .fetch_optional(&mut *self.db)
            .await?;

        Ok(setting)
    }

    /// Insert a row with the column defaults (the DEMO ceilings) unless one exists.
    ///
    /// Returns true when a row was created.
    #[instrument(skip(self), fields(workshop_id = %abbrev_uuid(&workshop_id)), err)]
    pub async fn create_if_missing(&mut self, workshop_id: WorkshopId) -> Result<bool> {
        let result = sqlx::query("INSERT INTO settings (workshop_id) VALUES ($1) ON CONFLICT (workshop_id) DO NOTHING")
            .bind(workshop_id)
            .execute(&mut *self.db)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Overwrite the derived fields. The row is only touched when at least one value differs,
    /// so `updated_at` moves only on real changes. Returns whether the row changed.
    #[instrument(skip(self, request), fields(workshop_id = %abbrev_uuid(&workshop_id)), err)]
    pub async fn write_limits(&mut self, workshop_id: WorkshopId, request: &SettingLimitsDBRequest) -> Result<bool> {
        let limits = &request.limits;
        let result = sqlx::query(
            r#"
            UPDATE settings SET
                package_history_id = $2,
                start_date = $3,
                end_date = $4,
                max_workers = $5,
                max_orders = $6,
                max_customers = $7,
                max_fittings = $8,
                max_order_groups = $9,
                updated_at = NOW()
            WHERE workshop_id = $1
              AND (package_history_id IS DISTINCT FROM $2
                OR start_date IS DISTINCT FROM $3
                OR end_date IS DISTINCT FROM $4
                OR max_workers <> $5
                OR max_orders <> $6
                OR max_customers <> $7
                OR max_fittings <> $8
                OR max_order_groups <> $9)
            "#,
        )
        .bind(workshop_id)
        .bind(request.package_history_id)
        .bind(request.start_date)
        .bind(request.end_date)
        .bind(limits.max_workers)
        .bind(limits.max_orders)
        .bind(limits.max_customers)
        .bind(limits.max_fittings)
        .bind(limits.max_order_groups)
        .execute(&mut *self.db)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self, request), fields(workshop_id = %abbrev_uuid(&workshop_id)), err)]
    pub async fn update(&mut self, workshop_id: WorkshopId, request: &SettingUpdateDBRequest) -> Result<SettingDBResponse> {
        let setting = sqlx::query_as::<_, SettingDBResponse>(
            r#"
            UPDATE settings SET
                start_date = COALESCE($2, start_date),
                end_date = COALESCE($3, end_date),
                max_order_ongoing_by_worker = COALESCE($4, max_order_ongoing_by_worker),
                updated_at = NOW()
            WHERE workshop_id = $1
            RETURNING *
            "#,
        )
        .bind(workshop_id)
        .bind(request.start_date)
        .bind(request.end_date)
        .bind(request.max_order_ongoing_by_worker)
        .fetch_optional(&mut *self.db)
        .await?
        .ok_or(DbError::NotFound)?;

        Ok(setting)
    }

    /// Add a worker to a grant set. Returns false if the worker was already in it.
    #[instrument(skip(self), fields(workshop_id = %abbrev_uuid(&workshop_id), worker_id = %abbrev_uuid(&worker_id), capability = %capability), err)]
    pub async fn add_grant(&mut self, workshop_id: WorkshopId, capability: Capability, worker_id: WorkerId) -> Result<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO setting_authorizations (workshop_id, capability, worker_id)
            VALUES ($1, $2, $3)
            ON CONFLICT (workshop_id, capability, worker_id) DO NOTHING
            "#,
        )
        .bind(workshop_id)
        .bind(capability)
        .bind(worker_id)
        .execute(&mut *self.db)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Remove a worker from a grant set. Returns false if the worker was not in it.
    #[instrument(skip(self), fields(workshop_id = %abbrev_uuid(&workshop_id), worker_id = %abbrev_uuid(&worker_id), capability = %capability), err)]
    pub async fn remove_grant(&mut self, workshop_id: WorkshopId, capability: Capability, worker_id: WorkerId) -> Result<bool> {
        let result = sqlx::query(
            "DELETE FROM setting_authorizations WHERE workshop_id = $1 AND capability = $2 AND worker_id = $3",
        )
        .bind(workshop_id)
        .bind(capability)
        .bind(worker_id)
        .execute(&mut *self.db)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self), fields(workshop_id = %abbrev_uuid(&workshop_id), worker_id = %abbrev_uuid(&worker_id), capability = %capability), err)]
    pub async fn is_granted(&mut self, workshop_id: WorkshopId, capability: Capability, worker_id: WorkerId) -> Result<bool> {
        let granted: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM setting_authorizations a
                JOIN workers w ON w.id = a.worker_id
                WHERE a.workshop_id = $1 AND a.capability = $2 AND a.worker_id = $3 AND w.is_active
            )
            "#,
        )
        .bind(workshop_id)
        .bind(capability)
        .bind(worker_id)
        .fetch_one(&mut *self.db)
        .await?;

        Ok(granted)
    }

    /// Drop the worker from every grant set. Returns the capabilities it held.
    #[instrument(skip(self), fields(workshop_id = %abbrev_uuid(&workshop_id), worker_id = %abbrev_uuid(&worker_id)), err)]
    pub async fn remove_all_grants(&mut self, workshop_id: WorkshopId, worker_id: WorkerId) -> Result<Vec<Capability>> {
        let mut removed: Vec<Capability> = sqlx::query_scalar(
            "DELETE FROM setting_authorizations WHERE workshop_id = $1 AND worker_id = $2 RETURNING capability",
        )
        .bind(workshop_id)
        .bind(worker_id)
        .fetch_all(&mut *self.db)
        .await?;

        removed.sort_by_key(|c| c.as_str());
        Ok(removed)
    }

    /// Members of one grant set
    #[instrument(skip(self), fields(workshop_id = %abbrev_uuid(&workshop_id), capability = %capability), err)]
    pub async fn list_grant_set(&mut self, workshop_id: WorkshopId, capability: Capability) -> Result<Vec<WorkerId>> {
        let workers: Vec<Uuid> = sqlx::query_scalar(
            "SELECT worker_id FROM setting_authorizations WHERE workshop_id = $1 AND capability = $2 ORDER BY created_at, worker_id",
        )
        .bind(workshop_id)
        .bind(capability)
        .fetch_all(&mut *self.db)
        .await?;

        Ok(workers)
    }

    /// Every grant of the workshop, across all five sets
    #[instrument(skip(self), fields(workshop_id = %abbrev_uuid(&workshop_id)), err)]
    pub async fn list_grants(&mut self, workshop_id: WorkshopId) -> Result<Vec<AuthorizationDBResponse>> {
        let grants = sqlx::query_as::<_, AuthorizationDBResponse>(
            "SELECT * FROM setting_authorizations WHERE workshop_id = $1 ORDER BY capability, created_at, worker_id",
        )
        .bind(workshop_id)
        .fetch_all(&mut *self.db)
        .await?;

        Ok(grants)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::handlers::{Repository, Workers};
    use crate::db::models::workers::WorkerCreateDBRequest;
    use crate::packages::Tier;
    use crate::test_utils::{create_test_user, create_test_workshop};
    use sqlx::PgPool;

    #[sqlx::test]
    #[test_log::test]
    async fn test_defaults_are_the_demo_ceilings(pool: PgPool) {
        let workshop = create_test_workshop(&pool, "Atelier Defaults").await;
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Settings::new(&mut conn);

        assert!(repo.create_if_missing(workshop.id).await.unwrap());
        assert!(!repo.create_if_missing(workshop.id).await.unwrap());

        let setting = repo.get(workshop.id).await.unwrap().unwrap();
        assert_eq!(setting.limits(), Tier::Demo.limit_profile());
        assert_eq!(setting.max_order_ongoing_by_worker, 5);
        assert!(setting.package_history_id.is_none());
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_write_limits_only_reports_real_changes(pool: PgPool) {
        let workshop = create_test_workshop(&pool, "Atelier Limits").await;
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Settings::new(&mut conn);
        repo.create_if_missing(workshop.id).await.unwrap();

        let request = SettingLimitsDBRequest {
            package_history_id: None,
            start_date: None,
            end_date: None,
            limits: Tier::Basic.limit_profile(),
        };
        assert!(repo.write_limits(workshop.id, &request).await.unwrap());
        let after_first = repo.get(workshop.id).await.unwrap().unwrap();
        assert!(!repo.write_limits(workshop.id, &request).await.unwrap());
        let after_second = repo.get(workshop.id).await.unwrap().unwrap();

        assert_eq!(after_first, after_second);
        assert_eq!(after_second.max_workers, 15);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_grant_sets_are_independent(pool: PgPool) {
        let workshop = create_test_workshop(&pool, "Atelier Grants").await;
        let user = create_test_user(&pool, "grantee@example.com").await;
        let mut conn = pool.acquire().await.unwrap();
        let worker = Workers::new(&mut conn)
            .create(&WorkerCreateDBRequest::member(user.id, workshop.id))
            .await
            .unwrap();

        let mut repo = Settings::new(&mut conn);
        repo.create_if_missing(workshop.id).await.unwrap();

        assert!(repo.add_grant(workshop.id, Capability::Order, worker.id).await.unwrap());
        assert!(!repo.add_grant(workshop.id, Capability::Order, worker.id).await.unwrap());

        assert!(repo.is_granted(workshop.id, Capability::Order, worker.id).await.unwrap());
        assert!(!repo.is_granted(workshop.id, Capability::Fitting, worker.id).await.unwrap());
        assert_eq!(repo.list_grant_set(workshop.id, Capability::Order).await.unwrap(), vec![worker.id]);
        assert!(repo.list_grant_set(workshop.id, Capability::Setting).await.unwrap().is_empty());

        assert!(repo.remove_grant(workshop.id, Capability::Order, worker.id).await.unwrap());
        assert!(!repo.remove_grant(workshop.id, Capability::Order, worker.id).await.unwrap());
        assert!(repo.list_grants(workshop.id).await.unwrap().is_empty());
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_grants_of_inactive_workers_do_not_count(pool: PgPool) {
        let workshop = create_test_workshop(&pool, "Atelier Departures").await;
        let user = create_test_user(&pool, "leaving@example.com").await;
        let mut conn = pool.acquire().await.unwrap();
        let worker = Workers::new(&mut conn)
            .create(&WorkerCreateDBRequest::member(user.id, workshop.id))
            .await
            .unwrap();

        let mut repo = Settings::new(&mut conn);
        repo.create_if_missing(workshop.id).await.unwrap();
        repo.add_grant(workshop.id, Capability::Setting, worker.id).await.unwrap();
        repo.add_grant(workshop.id, Capability::Order, worker.id).await.unwrap();

        Workers::new(&mut conn).delete(worker.id).await.unwrap();
        let mut repo = Settings::new(&mut conn);
        assert!(!repo.is_granted(workshop.id, Capability::Order, worker.id).await.unwrap());

        let removed = repo.remove_all_grants(workshop.id, worker.id).await.unwrap();
        assert_eq!(removed, vec![Capability::Order, Capability::Setting]);
        assert!(repo.list_grants(workshop.id).await.unwrap().is_empty());
        assert!(repo.remove_all_grants(workshop.id, worker.id).await.unwrap().is_empty());
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_cross_tenant_grant_violates_foreign_key(pool: PgPool) {
        let home = create_test_workshop(&pool, "Atelier Home").await;
        let away = create_test_workshop(&pool, "Atelier Away").await;
        let user = create_test_user(&pool, "stranger@example.com").await;
        let mut conn = pool.acquire().await.unwrap();
        let stranger = Workers::new(&mut conn)
            .create(&WorkerCreateDBRequest::member(user.id, away.id))
            .await
            .unwrap();

        let mut repo = Settings::new(&mut conn);
        repo.create_if_missing(home.id).await.unwrap();
        let err = repo.add_grant(home.id, Capability::Customer, stranger.id).await.unwrap_err();
        assert!(matches!(err, DbError::ForeignKeyViolation { .. }));
    }
}
