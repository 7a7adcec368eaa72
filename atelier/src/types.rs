//! Common type definitions shared across the database, service and API layers.
//!
//! # ID Types
//!
//! All entity IDs are UUIDs wrapped in type aliases:
//!
//! - [`UserId`]: Identity behind a worker, recipient of notifications
//! - [`WorkshopId`]: Tenant identifier
//! - [`WorkerId`]: Staff member of a workshop
//! - [`CustomerId`], [`OrderId`], [`OrderGroupId`], [`FittingId`]: Quota-bound entities
//! - [`PackageHistoryId`]: Ledger entry
//! - [`NotificationId`]: Persisted notification
//! - [`ArticleTypeId`], [`ArticleId`]: Haberdashery inventory
//!
//! # Access Control Vocabulary
//!
//! - [`Capability`]: one of the five per-worker grants stored on a workshop's settings
//! - [`ResourceKind`]: an entity kind that is bounded by a quota ceiling

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use utoipa::ToSchema;
use uuid::Uuid;

pub type UserId = Uuid;
pub type WorkshopId = Uuid;
pub type WorkerId = Uuid;
pub type CustomerId = Uuid;
pub type OrderId = Uuid;
pub type OrderGroupId = Uuid;
pub type FittingId = Uuid;
pub type PackageHistoryId = Uuid;
pub type NotificationId = Uuid;
pub type ArticleTypeId = Uuid;
pub type ArticleId = Uuid;

/// Abbreviate a UUID to its first 8 characters for more readable logs and traces
/// Example: "550e8400-e29b-41d4-a716-446655440000" -> "550e8400"
pub fn abbrev_uuid(uuid: &Uuid) -> String {
    uuid.to_string().chars().take(8).collect()
}

/// A capability a worker can be granted within their workshop.
///
/// Each capability is an independent grant set on the workshop's settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "text", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Capability {
    Order,
    Fitting,
    Customer,
    Worker,
    Setting,
}

impl Capability {
    pub const ALL: [Capability; 5] = [
        Capability::Order,
        Capability::Fitting,
        Capability::Customer,
        Capability::Worker,
        Capability::Setting,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Capability::Order => "order",
            Capability::Fitting => "fitting",
            Capability::Customer => "customer",
            Capability::Worker => "worker",
            Capability::Setting => "setting",
        }
    }

    /// Short name used in notification titles
    pub fn label(&self) -> &'static str {
        match self {
            Capability::Order => "Order",
            Capability::Fitting => "Fitting",
            Capability::Customer => "Customer",
            Capability::Worker => "Worker",
            Capability::Setting => "Settings",
        }
    }

    /// What the grant lets a worker do, phrased for notification messages.
    pub fn describe(&self) -> &'static str {
        match self {
            Capability::Order => "add and edit the orders",
            Capability::Fitting => "add and edit the fittings",
            Capability::Customer => "view, add and edit the customer list",
            Capability::Worker => "add and edit the workers",
            Capability::Setting => "edit the settings",
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Capability {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Capability::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| format!("unknown capability '{s}'"))
    }
}

/// Entity kinds whose live count is bounded by a settings ceiling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Worker,
    Order,
    Customer,
    Fitting,
    OrderGroup,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 5] = [
        ResourceKind::Worker,
        ResourceKind::Order,
        ResourceKind::Customer,
        ResourceKind::Fitting,
        ResourceKind::OrderGroup,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Worker => "worker",
            ResourceKind::Order => "order",
            ResourceKind::Customer => "customer",
            ResourceKind::Fitting => "fitting",
            ResourceKind::OrderGroup => "order_group",
        }
    }

    /// The capability a non-owner needs to create this kind of entity.
    pub fn required_capability(&self) -> Capability {
        match self {
            ResourceKind::Worker => Capability::Worker,
            ResourceKind::Order | ResourceKind::OrderGroup => Capability::Order,
            ResourceKind::Customer => Capability::Customer,
            ResourceKind::Fitting => Capability::Fitting,
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_abbrev_uuid() {
        let id = Uuid::parse_str("550e8400-e29b-41d4-a716-446655440000").unwrap();
        assert_eq!(abbrev_uuid(&id), "550e8400");
    }

    #[test]
    fn test_capability_parses_its_own_name() {
        for capability in Capability::ALL {
            assert_eq!(capability.as_str().parse::<Capability>().unwrap(), capability);
        }
        assert!("billing".parse::<Capability>().is_err());
    }

    #[test]
    fn test_resource_kind_serde_uses_snake_case() {
        let kind: ResourceKind = serde_json::from_str("\"order_group\"").unwrap();
        assert_eq!(kind, ResourceKind::OrderGroup);
        assert_eq!(serde_json::to_string(&ResourceKind::Worker).unwrap(), "\"worker\"");
    }

    #[test]
    fn test_order_groups_need_the_order_grant() {
        assert_eq!(ResourceKind::OrderGroup.required_capability(), Capability::Order);
        assert_eq!(ResourceKind::Worker.required_capability(), Capability::Worker);
    }
}
