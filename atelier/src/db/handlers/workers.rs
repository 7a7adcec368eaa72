//! Database repository for workers.

use crate::db::{
    errors::{DbError, Result},
    handlers::repository::Repository,
    models::workers::{WorkerCreateDBRequest, WorkerDBResponse, WorkerUpdateDBRequest},
};
use crate::types::{UserId, WorkerId, WorkshopId, abbrev_uuid};
use sqlx::PgConnection;
use tracing::instrument;
use uuid::Uuid;

/// Filter for listing workers of a workshop
#[derive(Debug, Clone)]
pub struct WorkerFilter {
    pub workshop_id: WorkshopId,
    pub include_inactive: bool,
    pub skip: i64,
    pub limit: i64,
}

impl WorkerFilter {
    pub fn new(workshop_id: WorkshopId, skip: i64, limit: i64) -> Self {
        Self {
            workshop_id,
            include_inactive: false,
            skip,
            limit,
        }
    }

    pub fn with_inactive(mut self) -> Self {
        self.include_inactive = true;
        self
    }
}

pub struct Workers<'c> {
    db: &'c mut PgConnection,
}

impl<'c> Workers<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    /// The active worker record of a user within a workshop
    #[instrument(skip(self), fields(workshop_id = %abbrev_uuid(&workshop_id), user_id = %abbrev_uuid(&user_id)), err)]
    pub async fn get_active_membership(&mut self, workshop_id: WorkshopId, user_id: UserId) -> Result<Option<WorkerDBResponse>> {
        let worker = sqlx::query_as::<_, WorkerDBResponse>(
            "SELECT * FROM workers WHERE workshop_id = $1 AND user_id = $2 AND is_active",
        )
        .bind(workshop_id)
        .bind(user_id)
        .fetch_optional(&mut *self.db)
        .await?;

        Ok(worker)
    }

    /// Active owners of a workshop
    #[instrument(skip(self), fields(workshop_id = %abbrev_uuid(&workshop_id)), err)]
    pub async fn list_owners(&mut self, workshop_id: WorkshopId) -> Result<Vec<WorkerDBResponse>> {
        let owners = sqlx::query_as::<_, WorkerDBResponse>(
            "SELECT * FROM workers WHERE workshop_id = $1 AND is_owner AND is_active ORDER BY created_at, id",
        )
        .bind(workshop_id)
        .fetch_all(&mut *self.db)
        .await?;

        Ok(owners)
    }

    /// Of the given worker ids, those that are not active workers of the workshop
    #[instrument(skip(self, worker_ids), fields(workshop_id = %abbrev_uuid(&workshop_id), count = worker_ids.len()), err)]
    pub async fn foreign_to_workshop(&mut self, workshop_id: WorkshopId, worker_ids: &[WorkerId]) -> Result<Vec<WorkerId>> {
        if worker_ids.is_empty() {
            return Ok(Vec::new());
        }

        let known: Vec<(Uuid,)> = sqlx::query_as("SELECT id FROM workers WHERE workshop_id = $1 AND is_active AND id = ANY($2)")
            .bind(workshop_id)
            .bind(worker_ids)
            .fetch_all(&mut *self.db)
            .await?;

        Ok(worker_ids
            .iter()
            .filter(|id| !known.iter().any(|(k,)| k == *id))
            .copied()
            .collect())
    }
}

#[async_trait::async_trait]
impl<'c> Repository for Workers<'c> {
    type CreateRequest = WorkerCreateDBRequest;
    type UpdateRequest = WorkerUpdateDBRequest;
    type Response = WorkerDBResponse;
    type Id = WorkerId;
    type Filter = WorkerFilter;

    #[instrument(skip(self, request), fields(workshop_id = %abbrev_uuid(&request.workshop_id), is_owner = request.is_owner), err)]
    async fn create(&mut self, request: &Self::CreateRequest) -> Result<Self::Response> {
        let worker = sqlx::query_as::<_, WorkerDBResponse>(
            r#"
            INSERT INTO workers (id, user_id, workshop_id, is_owner, is_allowed, start_date, end_date)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(request.user_id)
        .bind(request.workshop_id)
        .bind(request.is_owner)
        .bind(request.is_allowed)
        .bind(request.start_date)
        .bind(request.end_date)
        .fetch_one(&mut *self.db)
        .await?;

        Ok(worker)
    }

    #[instrument(skip(self), fields(worker_id = %abbrev_uuid(&id)), err)]
    async fn get_by_id(&mut self, id: Self::Id) -> Result<Option<Self::Response>> {
        let worker = sqlx::query_as::<_, WorkerDBResponse>("SELECT * FROM workers WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *self.db)
            .await?;

        Ok(worker)
    }

    #[instrument(skip(self, filter), fields(workshop_id = %abbrev_uuid(&filter.workshop_id), limit = filter.limit, skip = filter.skip), err)]
    async fn list(&mut self, filter: &Self::Filter) -> Result<Vec<Self::Response>> {
        let workers = sqlx::query_as::<_, WorkerDBResponse>(
            r#"
            SELECT * FROM workers
            WHERE workshop_id = $1 AND (is_active OR $2)
            ORDER BY created_at, id
            LIMIT $3 OFFSET $4
            "#,
        )
        .bind(filter.workshop_id)
        .bind(filter.include_inactive)
        .bind(filter.limit)
        .bind(filter.skip)
        .fetch_all(&mut *self.db)
        .await?;

        Ok(workers)
    }

    /// Soft delete: the worker stops counting against the quota but keeps its history
    #[instrument(skip(self), fields(worker_id = %abbrev_uuid(&id)), err)]
    async fn delete(&mut self, id: Self::Id) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE workers SET is_active = FALSE, end_date = COALESCE(end_date, NOW()), updated_at = NOW() WHERE id = $1 AND is_active",
        )
        .bind(id)
        .execute(&mut *self.db)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self, request), fields(worker_id = %abbrev_uuid(&id)), err)]
    async fn update(&mut self, id: Self::Id, request: &Self::UpdateRequest) -> Result<Self::Response> {
        let worker = sqlx::query_as::<_, WorkerDBResponse>(
            r#"
            UPDATE workers SET
                is_allowed = COALESCE($2, is_allowed),
                end_date = COALESCE($3, end_date),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(request.is_allowed)
        .bind(request.end_date)
        .fetch_optional(&mut *self.db)
        .await?
        .ok_or(DbError::NotFound)?;

        Ok(worker)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{create_test_user, create_test_workshop};
    use sqlx::PgPool;

    #[sqlx::test]
    #[test_log::test]
    async fn test_soft_delete_hides_worker_from_default_listing(pool: PgPool) {
        let workshop = create_test_workshop(&pool, "Atelier Soft").await;
        let user = create_test_user(&pool, "tailor@example.com").await;

        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Workers::new(&mut conn);
        let worker = repo.create(&WorkerCreateDBRequest::member(user.id, workshop.id)).await.unwrap();
        assert!(worker.is_active);

        assert!(repo.delete(worker.id).await.unwrap());
        // Second delete is a no-op
        assert!(!repo.delete(worker.id).await.unwrap());

        let live = repo.list(&WorkerFilter::new(workshop.id, 0, 50)).await.unwrap();
        assert!(live.is_empty());
        let all = repo.list(&WorkerFilter::new(workshop.id, 0, 50).with_inactive()).await.unwrap();
        assert_eq!(all.len(), 1);
        assert!(all[0].end_date.is_some());

        assert!(repo.get_active_membership(workshop.id, user.id).await.unwrap().is_none());
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_foreign_to_workshop(pool: PgPool) {
        let home = create_test_workshop(&pool, "Atelier Home").await;
        let away = create_test_workshop(&pool, "Atelier Away").await;
        let alice = create_test_user(&pool, "alice@example.com").await;
        let bob = create_test_user(&pool, "bob@example.com").await;

        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Workers::new(&mut conn);
        let carol = create_test_user(&pool, "carol@example.com").await;
        let local = repo.create(&WorkerCreateDBRequest::member(alice.id, home.id)).await.unwrap();
        let stranger = repo.create(&WorkerCreateDBRequest::member(bob.id, away.id)).await.unwrap();
        let departed = repo.create(&WorkerCreateDBRequest::member(carol.id, home.id)).await.unwrap();
        repo.delete(departed.id).await.unwrap();
        let ghost = Uuid::new_v4();

        let foreign = repo
            .foreign_to_workshop(home.id, &[local.id, stranger.id, departed.id, ghost])
            .await
            .unwrap();
        assert_eq!(foreign, vec![stranger.id, departed.id, ghost]);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_list_owners(pool: PgPool) {
        let workshop = create_test_workshop(&pool, "Atelier Owners").await;
        let owner = create_test_user(&pool, "owner@example.com").await;
        let staff = create_test_user(&pool, "staff@example.com").await;

        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Workers::new(&mut conn);
        repo.create(&WorkerCreateDBRequest::owner(owner.id, workshop.id)).await.unwrap();
        repo.create(&WorkerCreateDBRequest::member(staff.id, workshop.id)).await.unwrap();

        let owners = repo.list_owners(workshop.id).await.unwrap();
        assert_eq!(owners.len(), 1);
        assert_eq!(owners[0].user_id, owner.id);
    }
}
