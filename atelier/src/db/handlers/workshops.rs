//! Database repository for workshops.

use crate::db::{
    errors::{DbError, Result},
    handlers::repository::Repository,
    models::workshops::{WorkshopCreateDBRequest, WorkshopDBResponse, WorkshopUpdateDBRequest},
};
use crate::types::{WorkshopId, abbrev_uuid};
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgConnection};
use tracing::instrument;
use uuid::Uuid;

/// Filter for listing workshops
#[derive(Debug, Clone)]
pub struct WorkshopFilter {
    pub skip: i64,
    pub limit: i64,
}

impl WorkshopFilter {
    pub fn new(skip: i64, limit: i64) -> Self {
        Self { skip, limit }
    }
}

#[derive(Debug, Clone, FromRow)]
struct Workshop {
    pub id: WorkshopId,
    pub name: String,
    pub slug: String,
    pub description: String,
    pub email: Option<String>,
    pub phone: String,
    pub country: String,
    pub city: Option<String>,
    pub address: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Workshop> for WorkshopDBResponse {
    fn from(w: Workshop) -> Self {
        Self {
            id: w.id,
            name: w.name,
            slug: w.slug,
            description: w.description,
            email: w.email,
            phone: w.phone,
            country: w.country,
            city: w.city,
            address: w.address,
            created_at: w.created_at,
            updated_at: w.updated_at,
        }
    }
}

/// Lowercase ASCII slug: alphanumerics kept, every other run of characters collapsed to one dash.
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    slug
}

pub struct Workshops<'c> {
    db: &'c mut PgConnection,
}

impl<'c> Workshops<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    /// Take a row lock on the workshop for the rest of the current transaction.
    ///
    /// Serializes ledger writers of the same workshop. Returns false when the workshop does not exist.
    #[instrument(skip(self), fields(workshop_id = %abbrev_uuid(&id)), err)]
    pub async fn lock(&mut self, id: WorkshopId) -> Result<bool> {
        let row: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM workshops WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *self.db)
            .await?;

        Ok(row.is_some())
    }
}

#[async_trait::async_trait]
impl<'c> Repository for Workshops<'c> {
    type CreateRequest = WorkshopCreateDBRequest;
    type UpdateRequest = WorkshopUpdateDBRequest;
    type Response = WorkshopDBResponse;
    type Id = WorkshopId;
    type Filter = WorkshopFilter;

    #[instrument(skip(self, request), fields(name = %request.name), err)]
    async fn create(&mut self, request: &Self::CreateRequest) -> Result<Self::Response> {
        let workshop = sqlx::query_as::<_, Workshop>(
            r#"
            INSERT INTO workshops (id, name, slug, description, email, phone, country, city, address)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&request.name)
        .bind(slugify(&request.name))
        .bind(&request.description)
        .bind(&request.email)
        .bind(&request.phone)
        .bind(&request.country)
        .bind(&request.city)
        .bind(&request.address)
        .fetch_one(&mut *self.db)
        .await?;

        Ok(WorkshopDBResponse::from(workshop))
    }

    #[instrument(skip(self), fields(workshop_id = %abbrev_uuid(&id)), err)]
    async fn get_by_id(&mut self, id: Self::Id) -> Result<Option<Self::Response>> {
        let workshop = sqlx::query_as::<_, Workshop>("SELECT * FROM workshops WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *self.db)
            .await?;

        Ok(workshop.map(WorkshopDBResponse::from))
    }

    #[instrument(skip(self, filter), fields(limit = filter.limit, skip = filter.skip), err)]
    async fn list(&mut self, filter: &Self::Filter) -> Result<Vec<Self::Response>> {
        let workshops = sqlx::query_as::<_, Workshop>("SELECT * FROM workshops ORDER BY name LIMIT $1 OFFSET $2")
            .bind(filter.limit)
            .bind(filter.skip)
            .fetch_all(&mut *self.db)
            .await?;

        Ok(workshops.into_iter().map(WorkshopDBResponse::from).collect())
    }

    #[instrument(skip(self), fields(workshop_id = %abbrev_uuid(&id)), err)]
    async fn delete(&mut self, id: Self::Id) -> Result<bool> {
        let result = sqlx::query("DELETE FROM workshops WHERE id = $1")
            .bind(id)
            .execute(&mut *self.db)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self, request), fields(workshop_id = %abbrev_uuid(&id)), err)]
    async fn update(&mut self, id: Self::Id, request: &Self::UpdateRequest) -> Result<Self::Response> {
        let workshop = sqlx::query_as::<_, Workshop>(
            r#"
            UPDATE workshops SET
                description = COALESCE($2, description),
                email = COALESCE($3, email),
                phone = COALESCE($4, phone),
                city = COALESCE($5, city),
                address = COALESCE($6, address),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&request.description)
        .bind(&request.email)
        .bind(&request.phone)
        .bind(&request.city)
        .bind(&request.address)
        .fetch_optional(&mut *self.db)
        .await?
        .ok_or(DbError::NotFound)?;

        Ok(WorkshopDBResponse::from(workshop))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::PgPool;

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Atelier A"), "atelier-a");
        assert_eq!(slugify("  Couture & Co.  "), "couture-co");
        assert_eq!(slugify("Maison--Ndiaye"), "maison-ndiaye");
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_create_update_and_lock(pool: PgPool) {
        let mut tx = pool.begin().await.unwrap();
        let mut repo = Workshops::new(&mut tx);

        let created = repo
            .create(&WorkshopCreateDBRequest {
                name: "Atelier Dakar".to_string(),
                country: "SN".to_string(),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(created.slug, "atelier-dakar");

        let updated = repo
            .update(
                created.id,
                &WorkshopUpdateDBRequest {
                    city: Some("Dakar".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.city.as_deref(), Some("Dakar"));
        assert_eq!(updated.country, "SN");

        assert!(repo.lock(created.id).await.unwrap());
        assert!(!repo.lock(Uuid::new_v4()).await.unwrap());
        tx.commit().await.unwrap();
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_duplicate_name_is_rejected(pool: PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Workshops::new(&mut conn);
        let request = WorkshopCreateDBRequest {
            name: "Atelier A".to_string(),
            ..Default::default()
        };

        repo.create(&request).await.unwrap();
        let err = repo.create(&request).await.unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { .. }));
    }
}
