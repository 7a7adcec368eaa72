//! Repository implementations for database access.
//!
//! Each repository wraps a borrowed `PgConnection` (a pooled connection or an open
//! transaction), binds parameters, and returns models from [`crate::db::models`].
//! Multi-step invariants such as "one active ledger entry" are composed by the
//! services in [`crate::services`], which own the transaction.
//!
//! # Available Repositories
//!
//! - [`Users`], [`Workshops`], [`Workers`]: tenancy
//! - [`Packages`]: seeded catalog rows
//! - [`PackageHistories`]: tier assignment ledger
//! - [`Settings`]: quota ceilings and the five grant sets
//! - [`Usage`]: live entity counts for quota checks
//! - [`Customers`], [`Orders`], [`OrderGroups`], [`Fittings`]: quota-bound entities
//! - [`Notifications`]: internal notifications and external message queue
//! - [`Haberdasheries`], [`ArticleTypes`], [`Articles`]: supplies inventory and its worker set
//!
//! # Common Pattern
//!
//! ```ignore
//! use atelier::db::handlers::{Repository, Workers};
//!
//! async fn example(pool: &sqlx::PgPool) -> Result<(), Box<dyn std::error::Error>> {
//!     let mut tx = pool.begin().await?;
//!     let mut repo = Workers::new(&mut tx);
//!     let worker = repo.get_by_id(worker_id).await?;
//!     tx.commit().await?;
//!     Ok(())
//! }
//! ```

pub mod article_types;
pub mod articles;
pub mod customers;
pub mod fittings;
pub mod haberdasheries;
pub mod notifications;
pub mod order_groups;
pub mod orders;
pub mod package_histories;
pub mod packages;
pub mod repository;
pub mod settings;
pub mod usage;
pub mod users;
pub mod workers;
pub mod workshops;

pub use article_types::ArticleTypes;
pub use articles::Articles;
pub use customers::Customers;
pub use fittings::Fittings;
pub use haberdasheries::Haberdasheries;
pub use notifications::Notifications;
pub use order_groups::OrderGroups;
pub use orders::Orders;
pub use package_histories::PackageHistories;
pub use packages::Packages;
pub use repository::Repository;
pub use settings::Settings;
pub use usage::Usage;
pub use users::Users;
pub use workers::Workers;
pub use workshops::Workshops;
