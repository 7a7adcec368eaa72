//! Database repository for customers.

use crate::db::{
    errors::{DbError, Result},
    handlers::repository::Repository,
    models::customers::{CustomerCreateDBRequest, CustomerDBResponse, CustomerUpdateDBRequest},
};
use crate::types::{CustomerId, WorkshopId, abbrev_uuid};
use sqlx::PgConnection;
use tracing::instrument;
use uuid::Uuid;

/// Filter for listing the live customers of a workshop
#[derive(Debug, Clone)]
pub struct CustomerFilter {
    pub workshop_id: WorkshopId,
    pub skip: i64,
    pub limit: i64,
}

impl CustomerFilter {
    pub fn new(workshop_id: WorkshopId, skip: i64, limit: i64) -> Self {
        Self { workshop_id, skip, limit }
    }
}

pub struct Customers<'c> {
    db: &'c mut PgConnection,
}

impl<'c> Customers<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }
}

#[async_trait::async_trait]
impl<'c> Repository for Customers<'c> {
    type CreateRequest = CustomerCreateDBRequest;
    type UpdateRequest = CustomerUpdateDBRequest;
    type Response = CustomerDBResponse;
    type Id = CustomerId;
    type Filter = CustomerFilter;

    #[instrument(skip(self, request), fields(workshop_id = %abbrev_uuid(&request.workshop_id)), err)]
    async fn create(&mut self, request: &Self::CreateRequest) -> Result<Self::Response> {
        let customer = sqlx::query_as::<_, CustomerDBResponse>(
            r#"
            INSERT INTO customers (id, workshop_id, first_name, last_name, nickname, gender, email, phone)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(request.workshop_id)
        .bind(&request.first_name)
        .bind(&request.last_name)
        .bind(&request.nickname)
        .bind(request.gender)
        .bind(&request.email)
        .bind(&request.phone)
        .fetch_one(&mut *self.db)
        .await?;

        Ok(customer)
    }

    #[instrument(skip(self), fields(customer_id = %abbrev_uuid(&id)), err)]
    async fn get_by_id(&mut self, id: Self::Id) -> Result<Option<Self::Response>> {
        let customer = sqlx::query_as::<_, CustomerDBResponse>("SELECT * FROM customers WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *self.db)
            .await?;

        Ok(customer)
    }

    #[instrument(skip(self, filter), fields(workshop_id = %abbrev_uuid(&filter.workshop_id)), err)]
    async fn list(&mut self, filter: &Self::Filter) -> Result<Vec<Self::Response>> {
        let customers = sqlx::query_as::<_, CustomerDBResponse>(
            r#"
            SELECT * FROM customers
            WHERE workshop_id = $1 AND is_active
            ORDER BY last_name, first_name, id
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(filter.workshop_id)
        .bind(filter.limit)
        .bind(filter.skip)
        .fetch_all(&mut *self.db)
        .await?;

        Ok(customers)
    }

    /// Soft delete
    #[instrument(skip(self), fields(customer_id = %abbrev_uuid(&id)), err)]
    async fn delete(&mut self, id: Self::Id) -> Result<bool> {
        let result = sqlx::query("UPDATE customers SET is_active = FALSE, updated_at = NOW() WHERE id = $1 AND is_active")
            .bind(id)
            .execute(&mut *self.db)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self, request), fields(customer_id = %abbrev_uuid(&id)), err)]
    async fn update(&mut self, id: Self::Id, request: &Self::UpdateRequest) -> Result<Self::Response> {
        let customer = sqlx::query_as::<_, CustomerDBResponse>(
            r#"
            UPDATE customers SET
                first_name = COALESCE($2, first_name),
                last_name = COALESCE($3, last_name),
                nickname = COALESCE($4, nickname),
                email = COALESCE($5, email),
                phone = COALESCE($6, phone),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&request.first_name)
        .bind(&request.last_name)
        .bind(&request.nickname)
        .bind(&request.email)
        .bind(&request.phone)
        .fetch_optional(&mut *self.db)
        .await?
        .ok_or(DbError::NotFound)?;

        Ok(customer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::customers::Gender;
    use crate::test_utils::create_test_workshop;
    use sqlx::PgPool;

    fn customer(workshop_id: WorkshopId, phone: &str) -> CustomerCreateDBRequest {
        CustomerCreateDBRequest {
            workshop_id,
            first_name: "Fatou".to_string(),
            last_name: "Diop".to_string(),
            nickname: "Fafa".to_string(),
            gender: Gender::Woman,
            email: None,
            phone: Some(phone.to_string()),
        }
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_phone_is_unique_per_workshop(pool: PgPool) {
        let first = create_test_workshop(&pool, "Atelier One").await;
        let second = create_test_workshop(&pool, "Atelier Two").await;
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Customers::new(&mut conn);

        repo.create(&customer(first.id, "+221770000000")).await.unwrap();
        // The same phone number is fine in another workshop
        repo.create(&customer(second.id, "+221770000000")).await.unwrap();

        let err = repo.create(&customer(first.id, "+221770000000")).await.unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { .. }));
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_soft_deleted_customers_are_not_listed(pool: PgPool) {
        let workshop = create_test_workshop(&pool, "Atelier Customers").await;
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Customers::new(&mut conn);

        let kept = repo.create(&customer(workshop.id, "1")).await.unwrap();
        let dropped = repo.create(&customer(workshop.id, "2")).await.unwrap();
        assert!(repo.delete(dropped.id).await.unwrap());

        let listed = repo.list(&CustomerFilter::new(workshop.id, 0, 10)).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, kept.id);
        assert!(!repo.get_by_id(dropped.id).await.unwrap().unwrap().is_active);
    }
}
