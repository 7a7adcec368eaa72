//! Database record models matching table schemas.
//!
//! Each module holds the create/update request types handed to a repository
//! and the response type it returns. API models in [`crate::api::models`]
//! convert from these, so storage and wire representations can evolve
//! independently.
//!
//! # Model Categories
//!
//! ## Tenancy
//!
//! - [`users`]: identities behind workers
//! - [`workshops`]: tenants
//! - [`workers`]: staff memberships, owners included
//!
//! ## Subscription and quotas
//!
//! - [`packages`]: seeded catalog rows
//! - [`package_histories`]: tier assignment ledger
//! - [`settings`]: quota ceilings and capability grants
//!
//! ## Quota-bound entities
//!
//! - [`customers`], [`orders`], [`order_groups`], [`fittings`]
//!
//! ## Inventory
//!
//! - [`haberdashery`]: the haberdashery, its article types and articles
//!
//! ## Side effects
//!
//! - [`notifications`]: internal notifications and queued external messages

pub mod customers;
pub mod fittings;
pub mod haberdashery;
pub mod notifications;
pub mod order_groups;
pub mod orders;
pub mod package_histories;
pub mod packages;
pub mod settings;
pub mod users;
pub mod workers;
pub mod workshops;
