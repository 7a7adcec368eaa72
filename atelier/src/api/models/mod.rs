//! API request and response data models.
//!
//! API models are distinct from database models so the wire format can evolve
//! independently of storage. Responses are built with `From` conversions from
//! the `*DBResponse` types.

pub mod customers;
pub mod haberdashery;
pub mod notifications;
pub mod orders;
pub mod package_history;
pub mod packages;
pub mod pagination;
pub mod settings;
pub mod users;
pub mod workers;
pub mod workshops;
