//! Database repository for haberdasheries and their worker sets.

use crate::db::{
    errors::{DbError, Result},
    models::haberdashery::{HaberdasheryDBResponse, HaberdasheryUpdateDBRequest},
};
use crate::types::{WorkerId, WorkshopId, abbrev_uuid};
use chrono::NaiveDate;
use sqlx::PgConnection;
use tracing::instrument;
use uuid::Uuid;

pub struct Haberdasheries<'c> {
    db: &'c mut PgConnection,
}

impl<'c> Haberdasheries<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    #[instrument(skip(self), fields(workshop_id = %abbrev_uuid(&workshop_id)), err)]
    pub async fn get(&mut self, workshop_id: WorkshopId) -> Result<Option<HaberdasheryDBResponse>> {
        let haberdashery = sqlx::query_as::<_, HaberdasheryDBResponse>("SELECT * FROM haberdasheries WHERE workshop_id = $1")
            .bind(workshop_id)
            .fetch_optional(&mut *self.db)
            .await?;

        Ok(haberdashery)
    }

    /// Insert an inactive haberdashery unless the workshop has one. Returns true when created.
    #[instrument(skip(self), fields(workshop_id = %abbrev_uuid(&workshop_id)), err)]
    pub async fn create_if_missing(&mut self, workshop_id: WorkshopId, end_date: Option<NaiveDate>) -> Result<bool> {
        let result = sqlx::query(
            "INSERT INTO haberdasheries (workshop_id, end_date) VALUES ($1, $2) ON CONFLICT (workshop_id) DO NOTHING",
        )
        .bind(workshop_id)
        .bind(end_date)
        .execute(&mut *self.db)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self, request), fields(workshop_id = %abbrev_uuid(&workshop_id)), err)]
    pub async fn update(&mut self, workshop_id: WorkshopId, request: &HaberdasheryUpdateDBRequest) -> Result<HaberdasheryDBResponse> {
        let haberdashery = sqlx::query_as::<_, HaberdasheryDBResponse>(
            r#"
            UPDATE haberdasheries SET
                is_active = COALESCE($2, is_active),
                end_date = COALESCE($3, end_date),
                updated_at = NOW()
            WHERE workshop_id = $1
            RETURNING *
            "#,
        )
        .bind(workshop_id)
        .bind(request.is_active)
        .bind(request.end_date)
        .fetch_optional(&mut *self.db)
        .await?
        .ok_or(DbError::NotFound)?;

        Ok(haberdashery)
    }

    /// Returns true when the worker was not yet in the set
    #[instrument(skip(self), fields(workshop_id = %abbrev_uuid(&workshop_id), worker_id = %abbrev_uuid(&worker_id)), err)]
    pub async fn add_worker(&mut self, workshop_id: WorkshopId, worker_id: WorkerId) -> Result<bool> {
        let result = sqlx::query(
            "INSERT INTO haberdashery_workers (workshop_id, worker_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
        )
        .bind(workshop_id)
        .bind(worker_id)
        .execute(&mut *self.db)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Returns true when the worker was in the set
    #[instrument(skip(self), fields(workshop_id = %abbrev_uuid(&workshop_id), worker_id = %abbrev_uuid(&worker_id)), err)]
    pub async fn remove_worker(&mut self, workshop_id: WorkshopId, worker_id: WorkerId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM haberdashery_workers WHERE workshop_id = $1 AND worker_id = $2")
            .bind(workshop_id)
            .bind(worker_id)
            .execute(&mut *self.db)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self), fields(workshop_id = %abbrev_uuid(&workshop_id)), err)]
    pub async fn list_workers(&mut self, workshop_id: WorkshopId) -> Result<Vec<WorkerId>> {
        let workers: Vec<Uuid> = sqlx::query_scalar(
            "SELECT worker_id FROM haberdashery_workers WHERE workshop_id = $1 ORDER BY created_at, worker_id",
        )
        .bind(workshop_id)
        .fetch_all(&mut *self.db)
        .await?;

        Ok(workers)
    }

    /// Whether an active worker is in the set
    #[instrument(skip(self), fields(workshop_id = %abbrev_uuid(&workshop_id), worker_id = %abbrev_uuid(&worker_id)), err)]
    pub async fn is_member(&mut self, workshop_id: WorkshopId, worker_id: WorkerId) -> Result<bool> {
        let member: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM haberdashery_workers h
                JOIN workers w ON w.id = h.worker_id
                WHERE h.workshop_id = $1 AND h.worker_id = $2 AND w.is_active
            )
            "#,
        )
        .bind(workshop_id)
        .bind(worker_id)
        .fetch_one(&mut *self.db)
        .await?;

        Ok(member)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::handlers::{Repository, Workers};
    use crate::db::models::workers::WorkerCreateDBRequest;
    use crate::test_utils::{create_test_user, create_test_workshop};
    use sqlx::PgPool;

    #[sqlx::test]
    #[test_log::test]
    async fn test_create_if_missing_keeps_the_first_row(pool: PgPool) {
        let workshop = create_test_workshop(&pool, "Atelier Mercerie").await;
        let end = NaiveDate::from_ymd_opt(2026, 1, 31).unwrap();
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Haberdasheries::new(&mut conn);

        assert!(repo.create_if_missing(workshop.id, Some(end)).await.unwrap());
        assert!(!repo.create_if_missing(workshop.id, None).await.unwrap());

        let haberdashery = repo.get(workshop.id).await.unwrap().unwrap();
        assert!(!haberdashery.is_active);
        assert_eq!(haberdashery.end_date, Some(end));

        let updated = repo
            .update(
                workshop.id,
                &HaberdasheryUpdateDBRequest {
                    is_active: Some(true),
                    end_date: None,
                },
            )
            .await
            .unwrap();
        assert!(updated.is_active);
        assert_eq!(updated.end_date, Some(end));
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_worker_set_only_counts_active_workers(pool: PgPool) {
        let workshop = create_test_workshop(&pool, "Atelier Fils").await;
        let user = create_test_user(&pool, "stock@example.com").await;
        let mut conn = pool.acquire().await.unwrap();
        let worker = Workers::new(&mut conn)
            .create(&WorkerCreateDBRequest::member(user.id, workshop.id))
            .await
            .unwrap();

        let mut repo = Haberdasheries::new(&mut conn);
        repo.create_if_missing(workshop.id, None).await.unwrap();
        assert!(repo.add_worker(workshop.id, worker.id).await.unwrap());
        assert!(!repo.add_worker(workshop.id, worker.id).await.unwrap());
        assert!(repo.is_member(workshop.id, worker.id).await.unwrap());
        assert_eq!(repo.list_workers(workshop.id).await.unwrap(), vec![worker.id]);

        Workers::new(&mut conn).delete(worker.id).await.unwrap();
        let mut repo = Haberdasheries::new(&mut conn);
        assert!(!repo.is_member(workshop.id, worker.id).await.unwrap());
        assert!(repo.remove_worker(workshop.id, worker.id).await.unwrap());
        assert!(repo.list_workers(workshop.id).await.unwrap().is_empty());
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_worker_of_another_workshop_violates_foreign_key(pool: PgPool) {
        let home = create_test_workshop(&pool, "Atelier Home").await;
        let away = create_test_workshop(&pool, "Atelier Away").await;
        let user = create_test_user(&pool, "stranger@example.com").await;
        let mut conn = pool.acquire().await.unwrap();
        let stranger = Workers::new(&mut conn)
            .create(&WorkerCreateDBRequest::member(user.id, away.id))
            .await
            .unwrap();

        let mut repo = Haberdasheries::new(&mut conn);
        repo.create_if_missing(home.id, None).await.unwrap();
        let err = repo.add_worker(home.id, stranger.id).await.unwrap_err();
        assert!(matches!(err, DbError::ForeignKeyViolation { .. }));
    }
}
