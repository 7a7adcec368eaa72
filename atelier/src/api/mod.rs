//! API layer for HTTP request handling and data models.
//!
//! - **[`handlers`]**: Axum route handlers for all API endpoints
//! - **[`models`]**: Request/response data structures for API communication
//!
//! # API Structure
//!
//! Everything lives under `/api/v1`:
//!
//! - **Packages** (`/packages`): the tier catalog
//! - **Workshops** (`/workshops/*`): workshops, workers and customers
//! - **Orders** (`/workshops/{id}/orders`, `/order-groups`, `/fittings`): quota-bound work items
//! - **Settings** (`/workshops/{id}/settings/*`): ceilings, quota checks and capability grants
//! - **Package history** (`/workshops/{id}/package-history`): tier ledger
//! - **Notifications** (`/notifications`, `/workshops/{id}/external-notifications`)
//!
//! # OpenAPI Documentation
//!
//! All endpoints are documented with `utoipa`. The rendered docs are served at `/docs`.

pub mod handlers;
pub mod models;
