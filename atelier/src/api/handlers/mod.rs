//! HTTP request handlers for all API endpoints.
//!
//! Handlers resolve the caller through the [`CurrentUser`](crate::api::models::users::CurrentUser)
//! extractor, run the workshop guards from [`crate::auth::permissions`], then delegate to the
//! services held by [`crate::AppState`]. Errors convert to JSON responses through
//! [`crate::errors::Error`].
//!
//! # Handler Modules
//!
//! - [`packages`]: tier catalog
//! - [`users`]: the calling user
//! - [`workshops`]: workshops, workers and customers
//! - [`orders`]: orders, order groups and fittings
//! - [`settings`]: settings, quota checks and capability grants
//! - [`package_history`]: tier assignment and ledger
//! - [`haberdashery`]: supplies inventory, article types and articles
//! - [`notifications`]: internal notifications and the external message queue

pub mod haberdashery;
pub mod notifications;
pub mod orders;
pub mod package_history;
pub mod packages;
pub mod settings;
pub mod users;
pub mod workshops;
