//! # atelier: multi-tenant backend for tailoring workshops
//!
//! `atelier` is the server behind a workshop management product. Each workshop is a tenant
//! with its own workers, customers, orders, order groups and fittings. What a workshop may
//! hold is bounded by its subscription package, and what each worker may do inside it is
//! governed by per-capability grants.
//!
//! ## Architecture
//!
//! The application is built on [Axum](https://github.com/tokio-rs/axum) for the HTTP layer and
//! uses PostgreSQL, through [sqlx], for all persistence.
//!
//! - [`db`]: repositories over a borrowed connection, one per table family
//! - [`services`]: transactional operations composing the repositories, including the
//!   package ledger, quota checks and capability grants
//! - [`notifications`]: renders domain events into internal notifications and queued
//!   customer messages once the originating transaction has committed
//! - [`api`] and [`auth`]: the HTTP surface under `/api/v1` and its permission guards
//!
//! ### Packages and quotas
//!
//! The four tiers and their limit profiles live in [`packages`]. Assigning a tier appends
//! an entry to the workshop's package history and re-derives the five ceilings stored in
//! its settings. A creation is allowed while the live count of that entity kind is below
//! its ceiling. The check is not isolated from concurrent creations, so a ceiling can be
//! overshot by the number of racing requests.
//!
//! ### Identity
//!
//! Requests are authenticated by an upstream proxy that asserts the caller's email in a
//! trusted header (`x-atelier-user` by default). Unknown users are created on first sight
//! unless `auth.auto_create_users` is disabled.
//!
//! ## Configuration
//!
//! See [`config`]: a YAML file merged with `ATELIER_`-prefixed environment variables, plus
//! `DATABASE_URL`.

pub mod api;
pub mod auth;
pub mod config;
pub mod db;
pub mod errors;
pub mod notifications;
mod openapi;
pub mod packages;
pub mod services;
pub mod telemetry;
pub mod types;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

use axum::{
    Router,
    routing::{delete, get, patch, post, put},
};
use bon::Builder;
use sqlx::{PgPool, postgres::PgPoolOptions};
use tokio::net::TcpListener;
use tower_http::trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer};
use tracing::{Level, debug, info, instrument};
use utoipa::OpenApi;
use utoipa_scalar::{Scalar, Servable};

pub use config::Config;
use db::handlers::Packages;
use notifications::Notifier;
use openapi::ApiDoc;
use services::{
    access::AccessCheck, haberdashery::HaberdasheryService, orders::OrderService, quota::QuotaService,
    workshops::WorkshopService,
};

/// Application state shared across all request handlers.
///
/// The services share one pool and one [`Notifier`]; cloning the state is cheap.
#[derive(Clone, Builder)]
pub struct AppState {
    pub db: PgPool,
    pub config: Config,
    pub notifier: Notifier,
    pub quota: QuotaService,
    pub access: AccessCheck,
    pub workshops: WorkshopService,
    pub orders: OrderService,
    pub haberdashery: HaberdasheryService,
}

impl AppState {
    /// Wire every service onto `pool`, sharing one notifier
    pub fn with_notifier(pool: PgPool, config: Config, notifier: Notifier) -> Self {
        let quota = QuotaService::new(pool.clone(), notifier.clone());

        AppState::builder()
            .access(AccessCheck::new(pool.clone(), quota.clone()))
            .workshops(WorkshopService::new(pool.clone(), notifier.clone()))
            .orders(OrderService::new(pool.clone(), notifier.clone()))
            .haberdashery(HaberdasheryService::new(pool.clone()))
            .quota(quota)
            .notifier(notifier)
            .config(config)
            .db(pool)
            .build()
    }

    /// Production wiring: notifications are persisted to Postgres
    pub fn new(pool: PgPool, config: Config) -> Self {
        let notifier = Notifier::postgres(pool.clone(), config.notifications.enabled);
        Self::with_notifier(pool, config, notifier)
    }
}

/// Get the atelier database migrator
pub fn migrator() -> sqlx::migrate::Migrator {
    sqlx::migrate!("./migrations")
}

/// Insert the catalog tiers missing from the `packages` table. Idempotent.
#[instrument(skip(pool), err)]
pub async fn seed_packages(pool: &PgPool) -> anyhow::Result<()> {
    let mut conn = pool.acquire().await?;
    let inserted = Packages::new(&mut conn).seed().await?;
    if inserted > 0 {
        info!(inserted, "Seeded package catalog");
    }
    Ok(())
}

/// Build the application router with every route and layer
pub fn build_router(state: &AppState) -> Router {
    use api::handlers::{haberdashery, notifications, orders, package_history, packages, settings, users, workshops};

    let api_routes = Router::new()
        .route("/packages", get(packages::list_packages))
        .route("/packages/{name}", get(packages::get_package))
        .route("/me", get(users::get_current_user))
        // Workshops and their members
        .route("/workshops", post(workshops::create_workshop))
        .route("/workshops/{workshop_id}", get(workshops::get_workshop))
        .route("/workshops/{workshop_id}/workers", get(workshops::list_workers))
        .route("/workshops/{workshop_id}/workers", post(workshops::add_worker))
        .route("/workshops/{workshop_id}/workers/{worker_id}", delete(workshops::remove_worker))
        .route("/workshops/{workshop_id}/customers", get(workshops::list_customers))
        .route("/workshops/{workshop_id}/customers", post(workshops::create_customer))
        .route(
            "/workshops/{workshop_id}/customers/{customer_id}",
            delete(workshops::remove_customer),
        )
        // Orders, groups and fittings
        .route("/workshops/{workshop_id}/orders", get(orders::list_orders))
        .route("/workshops/{workshop_id}/orders", post(orders::create_order))
        .route("/workshops/{workshop_id}/orders/{order_id}", patch(orders::update_order))
        .route("/workshops/{workshop_id}/orders/{order_id}", delete(orders::delete_order))
        .route(
            "/workshops/{workshop_id}/orders/{order_id}/fittings",
            get(orders::list_fittings),
        )
        .route("/workshops/{workshop_id}/order-groups", post(orders::create_order_group))
        .route("/workshops/{workshop_id}/fittings", post(orders::schedule_fitting))
        // Settings, quotas and grants
        .route("/workshops/{workshop_id}/settings", get(settings::get_settings))
        .route("/workshops/{workshop_id}/settings", patch(settings::update_settings))
        .route("/workshops/{workshop_id}/settings/reapply", post(settings::reapply_limits))
        .route("/workshops/{workshop_id}/settings/quotas/{kind}", get(settings::check_quota))
        .route(
            "/workshops/{workshop_id}/settings/authorizations",
            get(settings::list_authorizations),
        )
        .route(
            "/workshops/{workshop_id}/settings/authorizations/{capability}",
            put(settings::set_authorizations),
        )
        .route(
            "/workshops/{workshop_id}/settings/authorizations/{capability}/{worker_id}",
            get(settings::is_authorized)
                .put(settings::grant_authorization)
                .delete(settings::revoke_authorization),
        )
        // Haberdashery
        .route(
            "/workshops/{workshop_id}/haberdashery",
            get(haberdashery::get_haberdashery).patch(haberdashery::update_haberdashery),
        )
        .route("/workshops/{workshop_id}/haberdashery/workers", put(haberdashery::set_workers))
        .route(
            "/workshops/{workshop_id}/haberdashery/workers/{worker_id}",
            get(haberdashery::is_member)
                .put(haberdashery::add_worker)
                .delete(haberdashery::remove_worker),
        )
        .route(
            "/workshops/{workshop_id}/haberdashery/article-types",
            get(haberdashery::list_article_types).post(haberdashery::create_article_type),
        )
        .route(
            "/workshops/{workshop_id}/haberdashery/article-types/name-check",
            post(haberdashery::check_article_type_name),
        )
        .route(
            "/workshops/{workshop_id}/haberdashery/article-types/{article_type_id}",
            get(haberdashery::get_article_type)
                .patch(haberdashery::update_article_type)
                .delete(haberdashery::delete_article_type),
        )
        .route(
            "/workshops/{workshop_id}/haberdashery/article-types/{article_type_id}/name-check",
            post(haberdashery::check_article_name),
        )
        .route(
            "/workshops/{workshop_id}/haberdashery/articles",
            get(haberdashery::list_articles).post(haberdashery::create_article),
        )
        .route(
            "/workshops/{workshop_id}/haberdashery/articles/{article_id}",
            get(haberdashery::get_article)
                .patch(haberdashery::update_article)
                .delete(haberdashery::delete_article),
        )
        // Package ledger
        .route("/workshops/{workshop_id}/package-history", get(package_history::list_history))
        .route("/workshops/{workshop_id}/package-history", post(package_history::assign_tier))
        .route(
            "/workshops/{workshop_id}/package-history/active",
            get(package_history::get_active),
        )
        // Notifications
        .route("/notifications", get(notifications::list_notifications))
        .route("/notifications/{notification_id}", patch(notifications::mark_read))
        .route(
            "/workshops/{workshop_id}/external-notifications",
            get(notifications::list_external),
        )
        .with_state(state.clone());

    Router::new()
        .route("/healthz", get(|| async { "OK" }))
        .nest("/api/v1", api_routes)
        .merge(Scalar::with_url("/docs", ApiDoc::openapi()))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
}

/// Connect to the configured database, run migrations and seed the catalog
async fn setup_database(config: &Config) -> anyhow::Result<PgPool> {
    let pool_settings = &config.database.pool;
    let pool = PgPoolOptions::new()
        .max_connections(pool_settings.max_connections)
        .min_connections(pool_settings.min_connections)
        .acquire_timeout(pool_settings.acquire_timeout())
        .idle_timeout(pool_settings.idle_timeout())
        .max_lifetime(pool_settings.max_lifetime())
        .connect(&config.database.url)
        .await?;

    migrator().run(&pool).await?;
    seed_packages(&pool).await?;
    Ok(pool)
}

pub struct Application {
    router: Router,
    config: Config,
    pool: PgPool,
}

impl Application {
    /// Create a new application instance with all resources initialized
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        debug!("Starting atelier with configuration: {:#?}", config);
        let pool = setup_database(&config).await?;
        Ok(Self::from_state(AppState::new(pool.clone(), config.clone()), config, pool))
    }

    /// Build on an existing pool; migrations and seeding still run
    pub async fn new_with_pool(config: Config, pool: PgPool) -> anyhow::Result<Self> {
        migrator().run(&pool).await?;
        seed_packages(&pool).await?;
        Ok(Self::from_state(AppState::new(pool.clone(), config.clone()), config, pool))
    }

    fn from_state(state: AppState, config: Config, pool: PgPool) -> Self {
        Self {
            router: build_router(&state),
            config,
            pool,
        }
    }

    /// Convert application into a test server (for tests)
    #[cfg(any(test, feature = "test-utils"))]
    pub fn into_test_server(self) -> axum_test::TestServer {
        axum_test::TestServer::new(self.router.into_make_service()).expect("Failed to create test server")
    }

    /// Start serving the application
    pub async fn serve<F>(self, shutdown: F) -> anyhow::Result<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let bind_addr = self.config.bind_address();
        let listener = TcpListener::bind(&bind_addr).await?;
        info!(
            "atelier listening on http://{}, docs at http://localhost:{}/docs",
            bind_addr, self.config.port
        );

        axum::serve(listener, self.router.into_make_service())
            .with_graceful_shutdown(shutdown)
            .await?;

        info!("Closing database connections...");
        self.pool.close().await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::create_test_app;

    #[sqlx::test]
    #[test_log::test]
    async fn test_healthz_and_docs(pool: PgPool) {
        let app = create_test_app(pool).await;
        let response = app.get("/healthz").await;
        response.assert_status_ok();
        response.assert_text("OK");

        app.get("/docs").await.assert_status_ok();
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_seeding_is_idempotent(pool: PgPool) {
        seed_packages(&pool).await.unwrap();
        seed_packages(&pool).await.unwrap();
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM packages")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, 4);
    }
}
