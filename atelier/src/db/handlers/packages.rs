//! Database repository for the seeded package catalog.

use crate::db::{errors::Result, models::packages::PackageDBResponse};
use crate::packages::{CATALOG, Tier};
use rust_decimal::Decimal;
use sqlx::PgConnection;
use sqlx::types::Json;
use tracing::instrument;

pub struct Packages<'c> {
    db: &'c mut PgConnection,
}

impl<'c> Packages<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    /// Insert every catalog tier that is not in the table yet. Existing rows are left untouched.
    ///
    /// Returns the number of rows inserted.
    #[instrument(skip(self), err)]
    pub async fn seed(&mut self) -> Result<u64> {
        let mut inserted = 0;
        for entry in CATALOG.iter() {
            let features: Vec<String> = entry.features.iter().map(|f| f.to_string()).collect();
            let result = sqlx::query(
                r#"
                INSERT INTO packages (name, description, features, price, duration_days)
                VALUES ($1, $2, $3, $4, $5)
                ON CONFLICT (name) DO NOTHING
                "#,
            )
            .bind(entry.tier)
            .bind(entry.description)
            .bind(Json(features))
            .bind(Decimal::from(entry.price))
            .bind(entry.duration_days)
            .execute(&mut *self.db)
            .await?;
            inserted += result.rows_affected();
        }

        Ok(inserted)
    }

    #[instrument(skip(self), err)]
    pub async fn list(&mut self) -> Result<Vec<PackageDBResponse>> {
        let packages = sqlx::query_as::<_, PackageDBResponse>("SELECT * FROM packages ORDER BY price, name")
            .fetch_all(&mut *self.db)
            .await?;

        Ok(packages)
    }

    #[instrument(skip(self), err)]
    pub async fn get(&mut self, tier: Tier) -> Result<Option<PackageDBResponse>> {
        let package = sqlx::query_as::<_, PackageDBResponse>("SELECT * FROM packages WHERE name = $1")
            .bind(tier)
            .fetch_optional(&mut *self.db)
            .await?;

        Ok(package)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::PgPool;

    #[sqlx::test]
    #[test_log::test]
    async fn test_seed_is_idempotent(pool: PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Packages::new(&mut conn);

        assert_eq!(repo.seed().await.unwrap(), 4);
        assert_eq!(repo.seed().await.unwrap(), 0);

        let packages = repo.list().await.unwrap();
        let names: Vec<Tier> = packages.iter().map(|p| p.name).collect();
        assert_eq!(names, vec![Tier::Demo, Tier::Basic, Tier::Premium, Tier::Pro]);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_seeded_rows_mirror_the_catalog(pool: PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Packages::new(&mut conn);
        repo.seed().await.unwrap();

        let pro = repo.get(Tier::Pro).await.unwrap().unwrap();
        assert_eq!(pro.price, Decimal::from(80_000));
        assert_eq!(pro.duration_days, 30);
        assert_eq!(pro.features.0.len(), Tier::Pro.entry().features.len());
    }
}
