//! The haberdashery: a workshop's supplies inventory.
//!
//! Every workshop gets one, inactive, alongside its settings row. Article types
//! group articles; both are soft deleted and keep their names, so a deleted name
//! cannot be reused. Access goes through a worker set separate from the five
//! capability grants.

use sqlx::{PgConnection, PgPool};
use tracing::{info, instrument};

use crate::db::handlers::article_types::ArticleTypeFilter;
use crate::db::handlers::articles::ArticleFilter;
use crate::db::handlers::{ArticleTypes, Articles, Haberdasheries, Repository, Settings};
use crate::db::models::haberdashery::{
    ArticleCreateDBRequest, ArticleDBResponse, ArticleTypeCreateDBRequest, ArticleTypeDBResponse, ArticleTypeUpdateDBRequest,
    ArticleUpdateDBRequest, HaberdasheryDBResponse, HaberdasheryUpdateDBRequest,
};
use crate::errors::{Error, Result};
use crate::services::ensure_workshop;
use crate::services::quota::{AuthorizationDiff, ensure_same_tenant};
use crate::types::{ArticleId, ArticleTypeId, WorkerId, WorkshopId, abbrev_uuid};

/// Create the workshop's haberdashery if it has none, ending with the settings' end date.
pub(crate) async fn ensure_haberdashery(conn: &mut PgConnection, workshop_id: WorkshopId) -> Result<bool> {
    let end_date = Settings::new(&mut *conn).get(workshop_id).await?.and_then(|s| s.end_date);
    let created = Haberdasheries::new(conn).create_if_missing(workshop_id, end_date).await?;
    if created {
        info!(workshop_id = %abbrev_uuid(&workshop_id), "Created haberdashery");
    }
    Ok(created)
}

fn require_name(name: &str, what: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(Error::Validation {
            message: format!("{what} name cannot be empty"),
        });
    }
    Ok(())
}

/// A live article type of the workshop, or NotFound
async fn live_type(conn: &mut PgConnection, workshop_id: WorkshopId, id: ArticleTypeId) -> Result<ArticleTypeDBResponse> {
    ArticleTypes::new(conn)
        .get_by_id(id)
        .await?
        .filter(|t| t.workshop_id == workshop_id && !t.is_deleted)
        .ok_or_else(|| Error::not_found("Article type", id))
}

/// A live article of the workshop, or NotFound
async fn live_article(conn: &mut PgConnection, workshop_id: WorkshopId, id: ArticleId) -> Result<ArticleDBResponse> {
    Articles::new(conn)
        .get_in_workshop(workshop_id, id)
        .await?
        .filter(|a| !a.is_deleted)
        .ok_or_else(|| Error::not_found("Article", id))
}

#[derive(Clone)]
pub struct HaberdasheryService {
    pool: PgPool,
}

impl HaberdasheryService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Open a transaction on a workshop whose haberdashery is known to exist
    async fn begin(&self, workshop_id: WorkshopId) -> Result<sqlx::Transaction<'static, sqlx::Postgres>> {
        let mut tx = self.pool.begin().await?;
        ensure_workshop(&mut tx, workshop_id).await?;
        ensure_haberdashery(&mut tx, workshop_id).await?;
        Ok(tx)
    }

    #[instrument(skip(self), fields(workshop_id = %abbrev_uuid(&workshop_id)), err)]
    pub async fn get_haberdashery(&self, workshop_id: WorkshopId) -> Result<HaberdasheryDBResponse> {
        let mut tx = self.begin(workshop_id).await?;
        let haberdashery = Haberdasheries::new(&mut tx)
            .get(workshop_id)
            .await?
            .ok_or_else(|| Error::not_found("Haberdashery for workshop", workshop_id))?;
        tx.commit().await?;
        Ok(haberdashery)
    }

    #[instrument(skip(self, request), fields(workshop_id = %abbrev_uuid(&workshop_id)), err)]
    pub async fn update_haberdashery(
        &self,
        workshop_id: WorkshopId,
        request: &HaberdasheryUpdateDBRequest,
    ) -> Result<HaberdasheryDBResponse> {
        let mut tx = self.begin(workshop_id).await?;
        let updated = Haberdasheries::new(&mut tx).update(workshop_id, request).await?;
        tx.commit().await?;
        Ok(updated)
    }

    pub async fn list_workers(&self, workshop_id: WorkshopId) -> Result<Vec<WorkerId>> {
        let mut tx = self.begin(workshop_id).await?;
        let workers = Haberdasheries::new(&mut tx).list_workers(workshop_id).await?;
        tx.commit().await?;
        Ok(workers)
    }

    /// Whether the worker is an active member of the haberdashery's worker set
    pub async fn is_member(&self, workshop_id: WorkshopId, worker_id: WorkerId) -> Result<bool> {
        let mut conn = self.pool.acquire().await?;
        Ok(Haberdasheries::new(&mut conn).is_member(workshop_id, worker_id).await?)
    }

    /// Returns true only if the worker was not already in the set
    #[instrument(skip(self), fields(workshop_id = %abbrev_uuid(&workshop_id), worker_id = %abbrev_uuid(&worker_id)), err)]
    pub async fn add_worker(&self, workshop_id: WorkshopId, worker_id: WorkerId) -> Result<bool> {
        let mut tx = self.begin(workshop_id).await?;
        ensure_same_tenant(&mut tx, workshop_id, &[worker_id]).await?;
        let added = Haberdasheries::new(&mut tx).add_worker(workshop_id, worker_id).await?;
        tx.commit().await?;
        Ok(added)
    }

    #[instrument(skip(self), fields(workshop_id = %abbrev_uuid(&workshop_id), worker_id = %abbrev_uuid(&worker_id)), err)]
    pub async fn remove_worker(&self, workshop_id: WorkshopId, worker_id: WorkerId) -> Result<bool> {
        let mut tx = self.begin(workshop_id).await?;
        let removed = Haberdasheries::new(&mut tx).remove_worker(workshop_id, worker_id).await?;
        tx.commit().await?;
        Ok(removed)
    }

    /// Replace the worker set. Every worker is validated before anything changes.
    #[instrument(skip(self, worker_ids), fields(workshop_id = %abbrev_uuid(&workshop_id), count = worker_ids.len()), err)]
    pub async fn set_workers(&self, workshop_id: WorkshopId, worker_ids: &[WorkerId]) -> Result<AuthorizationDiff> {
        let mut tx = self.begin(workshop_id).await?;
        ensure_same_tenant(&mut tx, workshop_id, worker_ids).await?;

        let mut haberdasheries = Haberdasheries::new(&mut tx);
        let current = haberdasheries.list_workers(workshop_id).await?;
        let mut diff = AuthorizationDiff::default();
        for worker_id in worker_ids {
            if !current.contains(worker_id) && !diff.added.contains(worker_id) {
                haberdasheries.add_worker(workshop_id, *worker_id).await?;
                diff.added.push(*worker_id);
            }
        }
        for worker_id in &current {
            if !worker_ids.contains(worker_id) {
                haberdasheries.remove_worker(workshop_id, *worker_id).await?;
                diff.removed.push(*worker_id);
            }
        }
        tx.commit().await?;
        Ok(diff)
    }

    #[instrument(skip(self, request), fields(workshop_id = %abbrev_uuid(&request.workshop_id)), err)]
    pub async fn create_article_type(&self, request: &ArticleTypeCreateDBRequest) -> Result<ArticleTypeDBResponse> {
        require_name(&request.name, "Article type")?;
        let mut tx = self.begin(request.workshop_id).await?;
        let article_type = ArticleTypes::new(&mut tx).create(request).await?;
        tx.commit().await?;
        Ok(article_type)
    }

    pub async fn list_article_types(&self, workshop_id: WorkshopId, skip: i64, limit: i64) -> Result<Vec<ArticleTypeDBResponse>> {
        let mut tx = self.begin(workshop_id).await?;
        let types = ArticleTypes::new(&mut tx)
            .list(&ArticleTypeFilter::new(workshop_id, skip, limit))
            .await?;
        tx.commit().await?;
        Ok(types)
    }

    pub async fn get_article_type(&self, workshop_id: WorkshopId, id: ArticleTypeId) -> Result<ArticleTypeDBResponse> {
        let mut conn = self.pool.acquire().await?;
        live_type(&mut conn, workshop_id, id).await
    }

    #[instrument(skip(self, request), fields(workshop_id = %abbrev_uuid(&workshop_id), article_type_id = %abbrev_uuid(&id)), err)]
    pub async fn update_article_type(
        &self,
        workshop_id: WorkshopId,
        id: ArticleTypeId,
        request: &ArticleTypeUpdateDBRequest,
    ) -> Result<ArticleTypeDBResponse> {
        if let Some(name) = &request.name {
            require_name(name, "Article type")?;
        }
        let mut tx = self.pool.begin().await?;
        live_type(&mut tx, workshop_id, id).await?;
        let updated = ArticleTypes::new(&mut tx).update(id, request).await?;
        tx.commit().await?;
        Ok(updated)
    }

    #[instrument(skip(self), fields(workshop_id = %abbrev_uuid(&workshop_id), article_type_id = %abbrev_uuid(&id)), err)]
    pub async fn delete_article_type(&self, workshop_id: WorkshopId, id: ArticleTypeId) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        live_type(&mut tx, workshop_id, id).await?;
        ArticleTypes::new(&mut tx).delete(id).await?;
        tx.commit().await?;
        Ok(())
    }

    /// Whether `name` is taken by another article type of the workshop; `exclude` is the caller's current name.
    pub async fn article_type_name_exists(&self, workshop_id: WorkshopId, name: &str, exclude: Option<&str>) -> Result<bool> {
        let mut conn = self.pool.acquire().await?;
        ensure_workshop(&mut conn, workshop_id).await?;
        Ok(ArticleTypes::new(&mut conn).name_exists(workshop_id, name.trim(), exclude).await?)
    }

    /// Negative quantities are stored as zero
    #[instrument(skip(self, request), fields(workshop_id = %abbrev_uuid(&workshop_id), article_type_id = %abbrev_uuid(&request.article_type_id)), err)]
    pub async fn create_article(&self, workshop_id: WorkshopId, request: &ArticleCreateDBRequest) -> Result<ArticleDBResponse> {
        require_name(&request.name, "Article")?;
        let mut tx = self.pool.begin().await?;
        live_type(&mut tx, workshop_id, request.article_type_id).await?;
        let request = ArticleCreateDBRequest {
            quantity: request.quantity.max(0),
            ..request.clone()
        };
        let article = Articles::new(&mut tx).create(&request).await?;
        tx.commit().await?;
        Ok(article)
    }

    pub async fn list_articles(
        &self,
        workshop_id: WorkshopId,
        article_type_id: Option<ArticleTypeId>,
        skip: i64,
        limit: i64,
    ) -> Result<Vec<ArticleDBResponse>> {
        let mut conn = self.pool.acquire().await?;
        ensure_workshop(&mut conn, workshop_id).await?;
        let mut filter = ArticleFilter::new(workshop_id, skip, limit);
        if let Some(type_id) = article_type_id {
            live_type(&mut conn, workshop_id, type_id).await?;
            filter = filter.of_type(type_id);
        }
        Ok(Articles::new(&mut conn).list(&filter).await?)
    }

    pub async fn get_article(&self, workshop_id: WorkshopId, id: ArticleId) -> Result<ArticleDBResponse> {
        let mut conn = self.pool.acquire().await?;
        live_article(&mut conn, workshop_id, id).await
    }

    /// Moving an article requires a live target type in the same workshop
    #[instrument(skip(self, request), fields(workshop_id = %abbrev_uuid(&workshop_id), article_id = %abbrev_uuid(&id)), err)]
    pub async fn update_article(
        &self,
        workshop_id: WorkshopId,
        id: ArticleId,
        request: &ArticleUpdateDBRequest,
    ) -> Result<ArticleDBResponse> {
        if let Some(name) = &request.name {
            require_name(name, "Article")?;
        }
        let mut tx = self.pool.begin().await?;
        live_article(&mut tx, workshop_id, id).await?;
        if let Some(type_id) = request.article_type_id {
            live_type(&mut tx, workshop_id, type_id).await?;
        }
        let request = ArticleUpdateDBRequest {
            quantity: request.quantity.map(|q| q.max(0)),
            ..request.clone()
        };
        let updated = Articles::new(&mut tx).update(id, &request).await?;
        tx.commit().await?;
        Ok(updated)
    }

    #[instrument(skip(self), fields(workshop_id = %abbrev_uuid(&workshop_id), article_id = %abbrev_uuid(&id)), err)]
    pub async fn delete_article(&self, workshop_id: WorkshopId, id: ArticleId) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        live_article(&mut tx, workshop_id, id).await?;
        Articles::new(&mut tx).delete(id).await?;
        tx.commit().await?;
        Ok(())
    }

    /// Whether `name` is taken by another article of the type
    pub async fn article_name_exists(
        &self,
        workshop_id: WorkshopId,
        article_type_id: ArticleTypeId,
        name: &str,
        exclude: Option<&str>,
    ) -> Result<bool> {
        let mut conn = self.pool.acquire().await?;
        live_type(&mut conn, workshop_id, article_type_id).await?;
        Ok(Articles::new(&mut conn).name_exists(article_type_id, name.trim(), exclude).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::workshops::WorkshopCreateDBRequest;
    use crate::notifications::Notifier;
    use crate::services::workshops::WorkshopService;
    use crate::test_utils::{RecordingSink, create_test_user, create_test_workshop};
    use std::sync::Arc;

    fn workshops(pool: &PgPool) -> WorkshopService {
        let notifier = Notifier::new(pool.clone(), Arc::new(RecordingSink::default()), true);
        WorkshopService::new(pool.clone(), notifier)
    }

    fn workshop_request(name: &str) -> WorkshopCreateDBRequest {
        WorkshopCreateDBRequest {
            name: name.to_string(),
            description: "Tailoring".to_string(),
            phone: "+221 77 000 00 00".to_string(),
            country: "Senegal".to_string(),
            city: Some("Thies".to_string()),
            ..Default::default()
        }
    }

    fn article_type(workshop_id: WorkshopId, name: &str) -> ArticleTypeCreateDBRequest {
        ArticleTypeCreateDBRequest {
            workshop_id,
            name: name.to_string(),
            description: "Supplies".to_string(),
        }
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_new_workshop_has_an_inactive_haberdashery(pool: PgPool) {
        let workshop = workshops(&pool).create_workshop(&workshop_request("Atelier Neuf"), None).await.unwrap();

        let mut conn = pool.acquire().await.unwrap();
        let settings = Settings::new(&mut conn).get(workshop.id).await.unwrap().unwrap();
        let haberdashery = Haberdasheries::new(&mut conn).get(workshop.id).await.unwrap().unwrap();
        assert!(!haberdashery.is_active);
        assert!(haberdashery.end_date.is_some());
        assert_eq!(haberdashery.end_date, settings.end_date);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_worker_set_is_validated_and_diffed(pool: PgPool) {
        let owner = create_test_user(&pool, "owner@mercerie.example.com").await;
        let workshops = workshops(&pool);
        let workshop = workshops.create_workshop(&workshop_request("Atelier Mercerie"), Some(owner.id)).await.unwrap();
        let ada = workshops.add_worker(workshop.id, "ada@mercerie.example.com").await.unwrap();
        let bea = workshops.add_worker(workshop.id, "bea@mercerie.example.com").await.unwrap();
        let elsewhere = create_test_workshop(&pool, "Atelier Ailleurs").await;
        let stranger = workshops.add_worker(elsewhere.id, "stranger@ailleurs.example.com").await.unwrap();
        let service = HaberdasheryService::new(pool.clone());

        assert!(service.add_worker(workshop.id, ada.id).await.unwrap());
        let diff = service.set_workers(workshop.id, &[bea.id, bea.id]).await.unwrap();
        assert_eq!(diff.added, vec![bea.id]);
        assert_eq!(diff.removed, vec![ada.id]);
        assert!(service.is_member(workshop.id, bea.id).await.unwrap());
        assert!(!service.is_member(workshop.id, ada.id).await.unwrap());

        // One foreign worker rejects the whole set
        let err = service.set_workers(workshop.id, &[ada.id, stranger.id]).await.unwrap_err();
        assert!(matches!(err, Error::Validation { .. }));
        assert_eq!(service.list_workers(workshop.id).await.unwrap(), vec![bea.id]);

        // Leaving the workshop also leaves the haberdashery
        workshops.remove_worker(workshop.id, bea.id).await.unwrap();
        assert!(service.list_workers(workshop.id).await.unwrap().is_empty());
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_articles_clamp_quantity_and_need_a_live_type(pool: PgPool) {
        let workshop = create_test_workshop(&pool, "Atelier Stock").await;
        let other = create_test_workshop(&pool, "Atelier Autre").await;
        let service = HaberdasheryService::new(pool.clone());

        let buttons = service.create_article_type(&article_type(workshop.id, "Boutons")).await.unwrap();
        let foreign = service.create_article_type(&article_type(other.id, "Boutons")).await.unwrap();

        let article = service
            .create_article(
                workshop.id,
                &ArticleCreateDBRequest {
                    article_type_id: buttons.id,
                    name: "Nacre".to_string(),
                    quantity: -4,
                    is_out: false,
                },
            )
            .await
            .unwrap();
        assert_eq!(article.quantity, 0);

        let restocked = service
            .update_article(
                workshop.id,
                article.id,
                &ArticleUpdateDBRequest {
                    quantity: Some(25),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(restocked.quantity, 25);

        // A type from another workshop is not found
        let err = service
            .update_article(
                workshop.id,
                article.id,
                &ArticleUpdateDBRequest {
                    article_type_id: Some(foreign.id),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound { .. }));
        let err = service.get_article(other.id, article.id).await.unwrap_err();
        assert!(matches!(err, Error::NotFound { .. }));

        service.delete_article_type(workshop.id, buttons.id).await.unwrap();
        let err = service
            .create_article(
                workshop.id,
                &ArticleCreateDBRequest {
                    article_type_id: buttons.id,
                    name: "Corne".to_string(),
                    quantity: 1,
                    is_out: false,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound { .. }));
        assert!(service.list_articles(workshop.id, None, 0, 10).await.unwrap().is_empty());
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_name_checks(pool: PgPool) {
        let workshop = create_test_workshop(&pool, "Atelier Noms").await;
        let service = HaberdasheryService::new(pool.clone());
        let thread = service.create_article_type(&article_type(workshop.id, "Fil")).await.unwrap();
        service
            .create_article(
                workshop.id,
                &ArticleCreateDBRequest {
                    article_type_id: thread.id,
                    name: "Bobine".to_string(),
                    quantity: 2,
                    is_out: false,
                },
            )
            .await
            .unwrap();

        assert!(service.article_type_name_exists(workshop.id, " Fil ", None).await.unwrap());
        assert!(!service.article_type_name_exists(workshop.id, "Fil", Some("Fil")).await.unwrap());
        assert!(service.article_name_exists(workshop.id, thread.id, "Bobine", None).await.unwrap());
        assert!(!service.article_name_exists(workshop.id, thread.id, "Canette", None).await.unwrap());

        let err = service.create_article_type(&article_type(workshop.id, "  ")).await.unwrap_err();
        assert!(matches!(err, Error::Validation { .. }));
        let err = service.create_article_type(&article_type(workshop.id, "Fil")).await.unwrap_err();
        assert_eq!(err.status_code(), axum::http::StatusCode::CONFLICT);
    }
}
