//! Authentication and workshop-scoped authorization.
//!
//! Identity comes from a trusted header set by an upstream proxy (see
//! [`crate::config::AuthConfig`]); [`current_user`] turns it into a
//! [`CurrentUser`](crate::api::models::users::CurrentUser) extractor.
//!
//! Authorization is per workshop. Owners may do anything in their workshop,
//! other active workers need the matching capability grant, and creations are
//! additionally bounded by the quota ceilings. The guards in [`permissions`]
//! turn those checks into `401`/`403` responses.

pub mod current_user;
pub mod permissions;
