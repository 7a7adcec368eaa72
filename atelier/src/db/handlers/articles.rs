//! Database repository for haberdashery articles.

use crate::db::{
    errors::{DbError, Result},
    handlers::repository::Repository,
    models::haberdashery::{ArticleCreateDBRequest, ArticleDBResponse, ArticleUpdateDBRequest},
};
use crate::types::{ArticleId, ArticleTypeId, WorkshopId, abbrev_uuid};
use sqlx::PgConnection;
use tracing::instrument;
use uuid::Uuid;

/// Filter for listing the live articles of a workshop, optionally of one type
#[derive(Debug, Clone)]
pub struct ArticleFilter {
    pub workshop_id: WorkshopId,
    pub article_type_id: Option<ArticleTypeId>,
    pub skip: i64,
    pub limit: i64,
}

impl ArticleFilter {
    pub fn new(workshop_id: WorkshopId, skip: i64, limit: i64) -> Self {
        Self {
            workshop_id,
            article_type_id: None,
            skip,
            limit,
        }
    }

    pub fn of_type(mut self, article_type_id: ArticleTypeId) -> Self {
        self.article_type_id = Some(article_type_id);
        self
    }
}

pub struct Articles<'c> {
    db: &'c mut PgConnection,
}

impl<'c> Articles<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    /// Look up an article through its type's workshop
    #[instrument(skip(self), fields(workshop_id = %abbrev_uuid(&workshop_id), article_id = %abbrev_uuid(&id)), err)]
    pub async fn get_in_workshop(&mut self, workshop_id: WorkshopId, id: ArticleId) -> Result<Option<ArticleDBResponse>> {
        let article = sqlx::query_as::<_, ArticleDBResponse>(
            r#"
            SELECT a.* FROM articles a
            JOIN article_types t ON t.id = a.article_type_id
            WHERE a.id = $1 AND t.workshop_id = $2
            "#,
        )
        .bind(id)
        .bind(workshop_id)
        .fetch_optional(&mut *self.db)
        .await?;

        Ok(article)
    }

    /// Whether the name is taken within the type, deleted articles included
    #[instrument(skip(self, name, exclude), fields(article_type_id = %abbrev_uuid(&article_type_id)), err)]
    pub async fn name_exists(&mut self, article_type_id: ArticleTypeId, name: &str, exclude: Option<&str>) -> Result<bool> {
        let exists: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM articles
                WHERE article_type_id = $1 AND name = $2 AND ($3::TEXT IS NULL OR name <> $3)
            )
            "#,
        )
        .bind(article_type_id)
        .bind(name)
        .bind(exclude)
        .fetch_one(&mut *self.db)
        .await?;

        Ok(exists)
    }
}

#[async_trait::async_trait]
impl<'c> Repository for Articles<'c> {
    type CreateRequest = ArticleCreateDBRequest;
    type UpdateRequest = ArticleUpdateDBRequest;
    type Response = ArticleDBResponse;
    type Id = ArticleId;
    type Filter = ArticleFilter;

    #[instrument(skip(self, request), fields(article_type_id = %abbrev_uuid(&request.article_type_id)), err)]
    async fn create(&mut self, request: &Self::CreateRequest) -> Result<Self::Response> {
        let article = sqlx::query_as::<_, ArticleDBResponse>(
            r#"
            INSERT INTO articles (id, article_type_id, name, quantity, is_out)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(request.article_type_id)
        .bind(&request.name)
        .bind(request.quantity)
        .bind(request.is_out)
        .fetch_one(&mut *self.db)
        .await?;

        Ok(article)
    }

    #[instrument(skip(self), fields(article_id = %abbrev_uuid(&id)), err)]
    async fn get_by_id(&mut self, id: Self::Id) -> Result<Option<Self::Response>> {
        let article = sqlx::query_as::<_, ArticleDBResponse>("SELECT * FROM articles WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *self.db)
            .await?;

        Ok(article)
    }

    /// Live articles whose type is live too
    #[instrument(skip(self, filter), fields(workshop_id = %abbrev_uuid(&filter.workshop_id)), err)]
    async fn list(&mut self, filter: &Self::Filter) -> Result<Vec<Self::Response>> {
        let articles = sqlx::query_as::<_, ArticleDBResponse>(
            r#"
            SELECT a.* FROM articles a
            JOIN article_types t ON t.id = a.article_type_id
            WHERE t.workshop_id = $1
              AND ($2::UUID IS NULL OR a.article_type_id = $2)
              AND NOT a.is_deleted AND NOT t.is_deleted
            ORDER BY a.name, a.id
            LIMIT $3 OFFSET $4
            "#,
        )
        .bind(filter.workshop_id)
        .bind(filter.article_type_id)
        .bind(filter.limit)
        .bind(filter.skip)
        .fetch_all(&mut *self.db)
        .await?;

        Ok(articles)
    }

    /// Soft delete
    #[instrument(skip(self), fields(article_id = %abbrev_uuid(&id)), err)]
    async fn delete(&mut self, id: Self::Id) -> Result<bool> {
        let result = sqlx::query("UPDATE articles SET is_deleted = TRUE, updated_at = NOW() WHERE id = $1 AND NOT is_deleted")
            .bind(id)
            .execute(&mut *self.db)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self, request), fields(article_id = %abbrev_uuid(&id)), err)]
    async fn update(&mut self, id: Self::Id, request: &Self::UpdateRequest) -> Result<Self::Response> {
        let article = sqlx::query_as::<_, ArticleDBResponse>(
            r#"
            UPDATE articles SET
                article_type_id = COALESCE($2, article_type_id),
                name = COALESCE($3, name),
                quantity = COALESCE($4, quantity),
                is_out = COALESCE($5, is_out),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(request.article_type_id)
        .bind(&request.name)
        .bind(request.quantity)
        .bind(request.is_out)
        .fetch_optional(&mut *self.db)
        .await?
        .ok_or(DbError::NotFound)?;

        Ok(article)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::handlers::{ArticleTypes, Haberdasheries};
    use crate::db::models::haberdashery::{ArticleTypeCreateDBRequest, ArticleTypeDBResponse};
    use crate::test_utils::create_test_workshop;
    use sqlx::PgPool;

    async fn create_type(conn: &mut PgConnection, workshop_id: WorkshopId, name: &str) -> ArticleTypeDBResponse {
        Haberdasheries::new(conn).create_if_missing(workshop_id, None).await.unwrap();
        ArticleTypes::new(conn)
            .create(&ArticleTypeCreateDBRequest {
                workshop_id,
                name: name.to_string(),
                description: String::new(),
            })
            .await
            .unwrap()
    }

    fn article(article_type_id: ArticleTypeId, name: &str, quantity: i32) -> ArticleCreateDBRequest {
        ArticleCreateDBRequest {
            article_type_id,
            name: name.to_string(),
            quantity,
            is_out: false,
        }
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_list_filters_by_type_and_hides_deleted(pool: PgPool) {
        let workshop = create_test_workshop(&pool, "Atelier Stock").await;
        let mut conn = pool.acquire().await.unwrap();
        let buttons = create_type(&mut conn, workshop.id, "Boutons").await;
        let zips = create_type(&mut conn, workshop.id, "Zips").await;

        let mut repo = Articles::new(&mut conn);
        let pearl = repo.create(&article(buttons.id, "Nacre 12mm", 40)).await.unwrap();
        let horn = repo.create(&article(buttons.id, "Corne 15mm", 10)).await.unwrap();
        let metal = repo.create(&article(zips.id, "Metal 20cm", 5)).await.unwrap();
        assert!(repo.delete(horn.id).await.unwrap());

        let all = repo.list(&ArticleFilter::new(workshop.id, 0, 10)).await.unwrap();
        let ids: Vec<_> = all.iter().map(|a| a.id).collect();
        assert_eq!(ids, vec![metal.id, pearl.id]);

        let only_buttons = repo.list(&ArticleFilter::new(workshop.id, 0, 10).of_type(buttons.id)).await.unwrap();
        assert_eq!(only_buttons.len(), 1);
        assert_eq!(only_buttons[0].id, pearl.id);

        // Articles of a deleted type drop out of the listing
        ArticleTypes::new(&mut conn).delete(zips.id).await.unwrap();
        let mut repo = Articles::new(&mut conn);
        let remaining = repo.list(&ArticleFilter::new(workshop.id, 0, 10)).await.unwrap();
        assert_eq!(remaining.len(), 1);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_articles_stay_inside_their_workshop(pool: PgPool) {
        let home = create_test_workshop(&pool, "Atelier Home").await;
        let away = create_test_workshop(&pool, "Atelier Away").await;
        let mut conn = pool.acquire().await.unwrap();
        let thread = create_type(&mut conn, home.id, "Fil").await;

        let mut repo = Articles::new(&mut conn);
        let spool = repo.create(&article(thread.id, "Bobine rouge", 3)).await.unwrap();
        assert!(repo.get_in_workshop(home.id, spool.id).await.unwrap().is_some());
        assert!(repo.get_in_workshop(away.id, spool.id).await.unwrap().is_none());

        assert!(repo.name_exists(thread.id, "Bobine rouge", None).await.unwrap());
        assert!(!repo.name_exists(thread.id, "Bobine rouge", Some("Bobine rouge")).await.unwrap());

        let err = repo.create(&article(thread.id, "Bobine rouge", 1)).await.unwrap_err();
        assert_eq!(err.constraint(), Some("articles_name_type_unique"));
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_negative_quantity_is_check_violation(pool: PgPool) {
        let workshop = create_test_workshop(&pool, "Atelier Count").await;
        let mut conn = pool.acquire().await.unwrap();
        let thread = create_type(&mut conn, workshop.id, "Fil").await;

        let err = Articles::new(&mut conn)
            .create(&article(thread.id, "Bobine", -1))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::CheckViolation { .. }));
    }
}
