//! Database repository for haberdashery article types.

use crate::db::{
    errors::{DbError, Result},
    handlers::{repository::Repository, workshops::slugify},
    models::haberdashery::{ArticleTypeCreateDBRequest, ArticleTypeDBResponse, ArticleTypeUpdateDBRequest},
};
use crate::types::{ArticleTypeId, WorkshopId, abbrev_uuid};
use sqlx::PgConnection;
use tracing::instrument;
use uuid::Uuid;

/// Filter for listing the live article types of a workshop
#[derive(Debug, Clone)]
pub struct ArticleTypeFilter {
    pub workshop_id: WorkshopId,
    pub skip: i64,
    pub limit: i64,
}

impl ArticleTypeFilter {
    pub fn new(workshop_id: WorkshopId, skip: i64, limit: i64) -> Self {
        Self { workshop_id, skip, limit }
    }
}

pub struct ArticleTypes<'c> {
    db: &'c mut PgConnection,
}

impl<'c> ArticleTypes<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    /// Whether the name is taken in the workshop, deleted types included since they keep their name.
    #[instrument(skip(self, name, exclude), fields(workshop_id = %abbrev_uuid(&workshop_id)), err)]
    pub async fn name_exists(&mut self, workshop_id: WorkshopId, name: &str, exclude: Option<&str>) -> Result<bool> {
        let exists: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM article_types
                WHERE workshop_id = $1 AND name = $2 AND ($3::TEXT IS NULL OR name <> $3)
            )
            "#,
        )
        .bind(workshop_id)
        .bind(name)
        .bind(exclude)
        .fetch_one(&mut *self.db)
        .await?;

        Ok(exists)
    }
}

#[async_trait::async_trait]
impl<'c> Repository for ArticleTypes<'c> {
    type CreateRequest = ArticleTypeCreateDBRequest;
    type UpdateRequest = ArticleTypeUpdateDBRequest;
    type Response = ArticleTypeDBResponse;
    type Id = ArticleTypeId;
    type Filter = ArticleTypeFilter;

    #[instrument(skip(self, request), fields(workshop_id = %abbrev_uuid(&request.workshop_id)), err)]
    async fn create(&mut self, request: &Self::CreateRequest) -> Result<Self::Response> {
        let article_type = sqlx::query_as::<_, ArticleTypeDBResponse>(
            r#"
            INSERT INTO article_types (id, workshop_id, name, slug, description)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(request.workshop_id)
        .bind(&request.name)
        .bind(slugify(&request.name))
        .bind(&request.description)
        .fetch_one(&mut *self.db)
        .await?;

        Ok(article_type)
    }

    #[instrument(skip(self), fields(article_type_id = %abbrev_uuid(&id)), err)]
    async fn get_by_id(&mut self, id: Self::Id) -> Result<Option<Self::Response>> {
        let article_type = sqlx::query_as::<_, ArticleTypeDBResponse>("SELECT * FROM article_types WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *self.db)
            .await?;

        Ok(article_type)
    }

    #[instrument(skip(self, filter), fields(workshop_id = %abbrev_uuid(&filter.workshop_id)), err)]
    async fn list(&mut self, filter: &Self::Filter) -> Result<Vec<Self::Response>> {
        let article_types = sqlx::query_as::<_, ArticleTypeDBResponse>(
            r#"
            SELECT * FROM article_types
            WHERE workshop_id = $1 AND NOT is_deleted
            ORDER BY name, id
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(filter.workshop_id)
        .bind(filter.limit)
        .bind(filter.skip)
        .fetch_all(&mut *self.db)
        .await?;

        Ok(article_types)
    }

    /// Soft delete
    #[instrument(skip(self), fields(article_type_id = %abbrev_uuid(&id)), err)]
    async fn delete(&mut self, id: Self::Id) -> Result<bool> {
        let result =
            sqlx::query("UPDATE article_types SET is_deleted = TRUE, updated_at = NOW() WHERE id = $1 AND NOT is_deleted")
                .bind(id)
                .execute(&mut *self.db)
                .await?;

        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self, request), fields(article_type_id = %abbrev_uuid(&id)), err)]
    async fn update(&mut self, id: Self::Id, request: &Self::UpdateRequest) -> Result<Self::Response> {
        let slug = request.name.as_deref().map(slugify);
        let article_type = sqlx::query_as::<_, ArticleTypeDBResponse>(
            r#"
            UPDATE article_types SET
                name = COALESCE($2, name),
                slug = COALESCE($3, slug),
                description = COALESCE($4, description),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&request.name)
        .bind(slug)
        .bind(&request.description)
        .fetch_optional(&mut *self.db)
        .await?
        .ok_or(DbError::NotFound)?;

        Ok(article_type)
    }
}
