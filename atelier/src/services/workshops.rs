//! Workshops, their workers and their customers.

use chrono::Utc;
use sqlx::PgPool;
use tracing::{info, instrument};

use crate::db::handlers::customers::CustomerFilter;
use crate::db::handlers::workers::WorkerFilter;
use crate::db::handlers::{Customers, Haberdasheries, Repository, Settings, Users, Workers, Workshops};
use crate::db::models::customers::{CustomerCreateDBRequest, CustomerDBResponse};
use crate::db::models::workers::{WorkerCreateDBRequest, WorkerDBResponse};
use crate::db::models::workshops::{WorkshopCreateDBRequest, WorkshopDBResponse};
use crate::errors::{Error, Result};
use crate::notifications::{NotificationEvent, Notifier};
use crate::packages::Tier;
use crate::services::ensure_workshop;
use crate::services::ledger::{TierAssignment, assign_tier};
use crate::types::{CustomerId, UserId, WorkerId, WorkshopId, abbrev_uuid};

#[derive(Clone)]
pub struct WorkshopService {
    pool: PgPool,
    notifier: Notifier,
}

impl WorkshopService {
    pub fn new(pool: PgPool, notifier: Notifier) -> Self {
        Self { pool, notifier }
    }

    /// Create a workshop on the DEMO tier, optionally with its owner.
    ///
    /// The workshop row, the owner, the DEMO ledger entry and the settings row are
    /// written in one transaction.
    #[instrument(skip(self, request), fields(name = %request.name), err)]
    pub async fn create_workshop(&self, request: &WorkshopCreateDBRequest, owner: Option<UserId>) -> Result<WorkshopDBResponse> {
        if request.name.trim().is_empty() {
            return Err(Error::Validation {
                message: "Workshop name cannot be empty".to_string(),
            });
        }

        let mut tx = self.pool.begin().await?;
        let workshop = Workshops::new(&mut tx).create(request).await?;

        if let Some(user_id) = owner {
            Workers::new(&mut tx)
                .create(&WorkerCreateDBRequest::owner(user_id, workshop.id))
                .await?;
        }

        let today = Utc::now().date_naive();
        let demo = TierAssignment::builder()
            .workshop_id(workshop.id)
            .tier(Tier::Demo)
            .start_date(today)
            .end_date(today + Tier::Demo.duration())
            .build();
        assign_tier(&mut tx, &demo).await?;

        tx.commit().await?;
        info!(workshop_id = %abbrev_uuid(&workshop.id), "Created workshop");

        self.notifier
            .dispatch(vec![NotificationEvent::WorkshopCreated { workshop_id: workshop.id }])
            .await;
        Ok(workshop)
    }

    pub async fn get_workshop(&self, workshop_id: WorkshopId) -> Result<WorkshopDBResponse> {
        let mut conn = self.pool.acquire().await?;
        ensure_workshop(&mut conn, workshop_id).await
    }

    /// Add the user behind `email` to the workshop, creating the user if needed
    #[instrument(skip(self, email), fields(workshop_id = %abbrev_uuid(&workshop_id)), err)]
    pub async fn add_worker(&self, workshop_id: WorkshopId, email: &str) -> Result<WorkerDBResponse> {
        let email = email.trim();
        if !email.contains('@') {
            return Err(Error::Validation {
                message: format!("'{email}' is not a valid email address"),
            });
        }

        let mut tx = self.pool.begin().await?;
        ensure_workshop(&mut tx, workshop_id).await?;
        let user = Users::new(&mut tx).get_or_create_by_email(email).await?;
        let worker = Workers::new(&mut tx)
            .create(&WorkerCreateDBRequest::member(user.id, workshop_id))
            .await?;
        tx.commit().await?;

        Ok(worker)
    }

    pub async fn list_workers(&self, workshop_id: WorkshopId, skip: i64, limit: i64) -> Result<Vec<WorkerDBResponse>> {
        let mut conn = self.pool.acquire().await?;
        ensure_workshop(&mut conn, workshop_id).await?;
        Ok(Workers::new(&mut conn).list(&WorkerFilter::new(workshop_id, skip, limit)).await?)
    }

    /// Soft delete a worker and drop it from every grant set and the haberdashery. Owners cannot be removed.
    ///
    /// Each capability the worker held is reported to it as a revocation.
    #[instrument(skip(self), fields(workshop_id = %abbrev_uuid(&workshop_id), worker_id = %abbrev_uuid(&worker_id)), err)]
    pub async fn remove_worker(&self, workshop_id: WorkshopId, worker_id: WorkerId) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        let mut workers = Workers::new(&mut tx);
        let worker = workers
            .get_by_id(worker_id)
            .await?
            .filter(|w| w.workshop_id == workshop_id && w.is_active)
            .ok_or_else(|| Error::not_found("Worker", worker_id))?;
        if worker.is_owner {
            return Err(Error::Validation {
                message: "The workshop owner cannot be removed".to_string(),
            });
        }
        workers.delete(worker_id).await?;
        let revoked = Settings::new(&mut tx).remove_all_grants(workshop_id, worker_id).await?;
        Haberdasheries::new(&mut tx).remove_worker(workshop_id, worker_id).await?;
        tx.commit().await?;

        info!(revoked = revoked.len(), "Removed worker");
        let events = revoked
            .into_iter()
            .map(|capability| NotificationEvent::AuthorizationRevoked {
                workshop_id,
                worker_id,
                capability,
            })
            .collect();
        self.notifier.dispatch(events).await;
        Ok(())
    }

    #[instrument(skip(self, request), fields(workshop_id = %abbrev_uuid(&request.workshop_id)), err)]
    pub async fn create_customer(&self, request: &CustomerCreateDBRequest) -> Result<CustomerDBResponse> {
        if request.first_name.trim().is_empty() || request.last_name.trim().is_empty() {
            return Err(Error::Validation {
                message: "Customer first and last name are required".to_string(),
            });
        }

        let mut tx = self.pool.begin().await?;
        ensure_workshop(&mut tx, request.workshop_id).await?;
        let customer = Customers::new(&mut tx).create(request).await?;
        tx.commit().await?;

        self.notifier
            .dispatch(vec![NotificationEvent::CustomerCreated { customer_id: customer.id }])
            .await;
        Ok(customer)
    }

    pub async fn list_customers(&self, workshop_id: WorkshopId, skip: i64, limit: i64) -> Result<Vec<CustomerDBResponse>> {
        let mut conn = self.pool.acquire().await?;
        ensure_workshop(&mut conn, workshop_id).await?;
        Ok(Customers::new(&mut conn)
            .list(&CustomerFilter::new(workshop_id, skip, limit))
            .await?)
    }

    #[instrument(skip(self), fields(workshop_id = %abbrev_uuid(&workshop_id), customer_id = %abbrev_uuid(&customer_id)), err)]
    pub async fn remove_customer(&self, workshop_id: WorkshopId, customer_id: CustomerId) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        let mut customers = Customers::new(&mut tx);
        customers
            .get_by_id(customer_id)
            .await?
            .filter(|c| c.workshop_id == workshop_id && c.is_active)
            .ok_or_else(|| Error::not_found("Customer", customer_id))?;
        customers.delete(customer_id).await?;
        tx.commit().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::handlers::PackageHistories;
    use crate::db::models::customers::Gender;
    use crate::db::models::notifications::NotificationCategory;
    use crate::services::quota::QuotaService;
    use crate::test_utils::{RecordingSink, create_test_user};
    use crate::types::Capability;
    use std::sync::Arc;

    fn service(pool: &PgPool) -> (WorkshopService, Arc<RecordingSink>) {
        let sink = Arc::new(RecordingSink::default());
        let notifier = Notifier::new(pool.clone(), sink.clone(), true);
        (WorkshopService::new(pool.clone(), notifier), sink)
    }

    fn workshop_request(name: &str) -> WorkshopCreateDBRequest {
        WorkshopCreateDBRequest {
            name: name.to_string(),
            description: "Tailoring".to_string(),
            phone: "+221 77 000 00 00".to_string(),
            country: "Senegal".to_string(),
            ..Default::default()
        }
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_create_workshop_starts_on_demo(pool: PgPool) {
        let owner = create_test_user(&pool, "owner@atelier-a.example.com").await;
        let (service, sink) = service(&pool);

        let workshop = service
            .create_workshop(&workshop_request("Atelier A"), Some(owner.id))
            .await
            .unwrap();
        assert_eq!(workshop.slug, "atelier-a");

        let mut conn = pool.acquire().await.unwrap();
        let active = PackageHistories::new(&mut conn).get_active(workshop.id).await.unwrap().unwrap();
        assert_eq!(active.name, Tier::Demo);
        assert_eq!(active.end_date, Some(active.start_date + Tier::Demo.duration()));

        let setting = Settings::new(&mut conn).get(workshop.id).await.unwrap().unwrap();
        assert_eq!(setting.limits(), Tier::Demo.limit_profile());
        assert_eq!(setting.package_history_id, Some(active.id));

        let owners = Workers::new(&mut conn).list_owners(workshop.id).await.unwrap();
        assert_eq!(owners.len(), 1);
        assert_eq!(owners[0].user_id, owner.id);

        let delivered = sink.internal();
        assert_eq!(delivered.len(), 1);
        assert_eq!(delivered[0].user_id, owner.id);
        assert_eq!(delivered[0].category, NotificationCategory::WorkshopCreation);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_duplicate_workshop_name_leaves_nothing_behind(pool: PgPool) {
        let (service, _) = service(&pool);
        service.create_workshop(&workshop_request("Maison Ndiaye"), None).await.unwrap();

        let err = service
            .create_workshop(&workshop_request("Maison Ndiaye"), None)
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), axum::http::StatusCode::CONFLICT);

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM package_histories")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, 1);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_add_and_remove_workers(pool: PgPool) {
        let owner = create_test_user(&pool, "boss@example.com").await;
        let (service, _) = service(&pool);
        let workshop = service
            .create_workshop(&workshop_request("Atelier Staff"), Some(owner.id))
            .await
            .unwrap();

        let worker = service.add_worker(workshop.id, "tailor@example.com").await.unwrap();
        assert!(!worker.is_owner);
        assert_eq!(service.list_workers(workshop.id, 0, 100).await.unwrap().len(), 2);

        service.remove_worker(workshop.id, worker.id).await.unwrap();
        assert_eq!(service.list_workers(workshop.id, 0, 100).await.unwrap().len(), 1);

        // Removing twice, or removing the owner, fails
        let err = service.remove_worker(workshop.id, worker.id).await.unwrap_err();
        assert!(matches!(err, Error::NotFound { .. }));
        let owner_worker = service.list_workers(workshop.id, 0, 100).await.unwrap().remove(0);
        let err = service.remove_worker(workshop.id, owner_worker.id).await.unwrap_err();
        assert!(matches!(err, Error::Validation { .. }));

        let err = service.add_worker(workshop.id, "not-an-email").await.unwrap_err();
        assert!(matches!(err, Error::Validation { .. }));
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_removed_worker_loses_every_grant(pool: PgPool) {
        let owner = create_test_user(&pool, "owner@departures.example.com").await;
        let (service, sink) = service(&pool);
        let quota = QuotaService::new(pool.clone(), Notifier::new(pool.clone(), sink.clone(), true));
        let workshop = service
            .create_workshop(&workshop_request("Atelier Departures"), Some(owner.id))
            .await
            .unwrap();
        let worker = service.add_worker(workshop.id, "leaving@departures.example.com").await.unwrap();

        quota.grant_authorization(workshop.id, worker.id, Capability::Order).await.unwrap();
        quota.grant_authorization(workshop.id, worker.id, Capability::Fitting).await.unwrap();
        assert!(quota.is_authorized(workshop.id, worker.id, Capability::Order).await.unwrap());

        service.remove_worker(workshop.id, worker.id).await.unwrap();

        assert!(!quota.is_authorized(workshop.id, worker.id, Capability::Order).await.unwrap());
        assert!(!quota.is_authorized(workshop.id, worker.id, Capability::Fitting).await.unwrap());
        assert!(quota.list_authorizations(workshop.id).await.unwrap().values().all(Vec::is_empty));

        let rejections = sink
            .internal()
            .into_iter()
            .filter(|n| n.category == NotificationCategory::AuthorisationReject)
            .count();
        assert_eq!(rejections, 2);

        // A removed worker can no longer be granted anything
        let err = quota
            .grant_authorization(workshop.id, worker.id, Capability::Setting)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Validation { .. }));
        let grants = sink
            .internal()
            .into_iter()
            .filter(|n| n.category == NotificationCategory::AuthorisationAccept)
            .count();
        assert_eq!(grants, 2);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_create_customer_notifies_every_active_worker(pool: PgPool) {
        let owner = create_test_user(&pool, "owner@clients.example.com").await;
        let (service, sink) = service(&pool);
        let workshop = service
            .create_workshop(&workshop_request("Atelier Clients"), Some(owner.id))
            .await
            .unwrap();
        service.add_worker(workshop.id, "tailor@clients.example.com").await.unwrap();

        let customer = service
            .create_customer(&CustomerCreateDBRequest {
                workshop_id: workshop.id,
                first_name: "Awa".to_string(),
                last_name: "Diop".to_string(),
                nickname: "awa".to_string(),
                gender: Gender::Woman,
                email: None,
                phone: Some("+221 77 111 11 11".to_string()),
            })
            .await
            .unwrap();

        let creations: Vec<_> = sink
            .internal()
            .into_iter()
            .filter(|n| n.category == NotificationCategory::CustomerCreation)
            .collect();
        assert_eq!(creations.len(), 2);
        assert!(creations.iter().all(|n| n.object_id == Some(customer.id)));

        service.remove_customer(workshop.id, customer.id).await.unwrap();
        assert!(service.list_customers(workshop.id, 0, 100).await.unwrap().is_empty());
    }
}
