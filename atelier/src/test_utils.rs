//! Test utilities for integration testing.

use std::sync::Mutex;

use axum_test::TestServer;
use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;

use crate::AppState;
use crate::api::models::users::CurrentUser;
use crate::config::{AuthConfig, Config};
use crate::db::handlers::{Repository, Users, Workers, Workshops};
use crate::db::models::customers::{CustomerCreateDBRequest, CustomerDBResponse, Gender};
use crate::db::models::notifications::{ExternalNotificationCreateDBRequest, NotificationCreateDBRequest};
use crate::db::models::orders::{ClothingType, OrderCreateDBRequest, OrderDBResponse};
use crate::db::models::users::UserDBResponse;
use crate::db::models::workers::{WorkerCreateDBRequest, WorkerDBResponse};
use crate::db::models::workshops::{WorkshopCreateDBRequest, WorkshopDBResponse};
use crate::notifications::{NotificationSink, Outbox};
use crate::types::{CustomerId, WorkerId, WorkshopId};

pub fn create_test_config() -> Config {
    let mut config = Config::default();
    // Tests run on the pool handed out by #[sqlx::test]
    config.database.url = "postgres://unused-in-tests/atelier".to_string();
    config.database.pool.max_connections = 2;
    config
}

pub async fn create_test_app(pool: PgPool) -> TestServer {
    create_test_app_with_config(pool, create_test_config()).await
}

pub async fn create_test_app_with_config(pool: PgPool, config: Config) -> TestServer {
    crate::Application::new_with_pool(config, pool)
        .await
        .expect("Failed to create application")
        .into_test_server()
}

/// State over `pool` persisting notifications, for driving services next to a test server
pub fn create_test_state(pool: PgPool) -> AppState {
    AppState::new(pool, create_test_config())
}

/// Identity header for `email`, as the proxy would set it
pub fn auth_header(email: &str) -> (String, String) {
    (AuthConfig::default().header_name, email.to_string())
}

/// Returns the existing user when the email is already known
pub async fn create_test_user(pool: &PgPool, email: &str) -> UserDBResponse {
    let mut conn = pool.acquire().await.expect("Failed to acquire connection");
    Users::new(&mut conn)
        .get_or_create_by_email(email)
        .await
        .expect("Failed to create test user")
}

/// A bare workshop row: no owner, no package, no settings
pub async fn create_test_workshop(pool: &PgPool, name: &str) -> WorkshopDBResponse {
    let mut conn = pool.acquire().await.expect("Failed to acquire connection");
    Workshops::new(&mut conn)
        .create(&WorkshopCreateDBRequest {
            name: name.to_string(),
            description: "Test workshop".to_string(),
            phone: "+221 33 800 00 00".to_string(),
            country: "Senegal".to_string(),
            ..Default::default()
        })
        .await
        .expect("Failed to create test workshop")
}

/// A workshop created through the service: owner, DEMO package and settings included
pub async fn create_workshop_with_owner(state: &AppState, name: &str, owner_email: &str) -> (WorkshopDBResponse, CurrentUser) {
    let owner = create_test_user(&state.db, owner_email).await;
    let workshop = state
        .workshops
        .create_workshop(
            &WorkshopCreateDBRequest {
                name: name.to_string(),
                description: "Test workshop".to_string(),
                phone: "+221 33 800 00 00".to_string(),
                country: "Senegal".to_string(),
                ..Default::default()
            },
            Some(owner.id),
        )
        .await
        .expect("Failed to create workshop with owner");
    (workshop, owner.into())
}

pub async fn create_test_customer(state: &AppState, workshop_id: WorkshopId, phone: &str) -> CustomerDBResponse {
    state
        .workshops
        .create_customer(&CustomerCreateDBRequest {
            workshop_id,
            first_name: "Aminata".to_string(),
            last_name: "Fall".to_string(),
            nickname: "mina".to_string(),
            gender: Gender::Woman,
            email: Some("aminata@example.com".to_string()),
            phone: Some(phone.to_string()),
        })
        .await
        .expect("Failed to create test customer")
}

fn order_request(workshop_id: WorkshopId, customer_id: CustomerId, worker_id: WorkerId) -> OrderCreateDBRequest {
    let today = Utc::now().date_naive();
    OrderCreateDBRequest {
        workshop_id,
        customer_id,
        worker_id,
        gender: Gender::Woman,
        type_of_clothing: ClothingType::Dress,
        description: Some("Wax print, fitted waist".to_string()),
        clothing_model: "Taille basse".to_string(),
        amount: Decimal::from(25_000),
        down_payment: Decimal::ZERO,
        is_urgent: false,
        assign_date: Some(today),
        estimated_delivery_date: today + Duration::days(7),
        promised_delivery_date: today + Duration::days(10),
    }
}

pub async fn create_test_order(
    state: &AppState,
    workshop_id: WorkshopId,
    customer_id: CustomerId,
    worker_id: WorkerId,
) -> OrderDBResponse {
    state
        .orders
        .create_order(&order_request(workshop_id, customer_id, worker_id))
        .await
        .expect("Failed to create test order")
}

/// Everything an order needs, inserted directly through the repositories
pub struct OrderFixture {
    pub workshop: WorkshopDBResponse,
    pub worker: WorkerDBResponse,
    pub customer: CustomerDBResponse,
    pub request: OrderCreateDBRequest,
}

pub async fn create_order_fixture(pool: &PgPool) -> OrderFixture {
    let workshop = create_test_workshop(pool, "Atelier Fixture").await;
    let user = create_test_user(pool, "tailor@fixture.example.com").await;

    let mut conn = pool.acquire().await.expect("Failed to acquire connection");
    let worker = Workers::new(&mut conn)
        .create(&WorkerCreateDBRequest::member(user.id, workshop.id))
        .await
        .expect("Failed to create test worker");
    let customer = crate::db::handlers::Customers::new(&mut conn)
        .create(&CustomerCreateDBRequest {
            workshop_id: workshop.id,
            first_name: "Moussa".to_string(),
            last_name: "Ba".to_string(),
            nickname: "mb".to_string(),
            gender: Gender::Man,
            email: None,
            phone: Some("+221 77 555 55 55".to_string()),
        })
        .await
        .expect("Failed to create test customer");

    let request = order_request(workshop.id, customer.id, worker.id);
    OrderFixture {
        workshop,
        worker,
        customer,
        request,
    }
}

/// Sink that keeps every delivered outbox in memory
#[derive(Default)]
pub struct RecordingSink {
    internal: Mutex<Vec<NotificationCreateDBRequest>>,
    external: Mutex<Vec<ExternalNotificationCreateDBRequest>>,
}

impl RecordingSink {
    pub fn internal(&self) -> Vec<NotificationCreateDBRequest> {
        self.internal.lock().expect("poisoned").clone()
    }

    pub fn external(&self) -> Vec<ExternalNotificationCreateDBRequest> {
        self.external.lock().expect("poisoned").clone()
    }
}

#[async_trait::async_trait]
impl NotificationSink for RecordingSink {
    async fn deliver(&self, outbox: &Outbox) -> anyhow::Result<()> {
        self.internal.lock().expect("poisoned").extend(outbox.internal.iter().cloned());
        self.external.lock().expect("poisoned").extend(outbox.external.iter().cloned());
        Ok(())
    }
}

/// Sink whose every delivery fails
pub struct FailingSink;

#[async_trait::async_trait]
impl NotificationSink for FailingSink {
    async fn deliver(&self, _outbox: &Outbox) -> anyhow::Result<()> {
        anyhow::bail!("sink unavailable")
    }
}

