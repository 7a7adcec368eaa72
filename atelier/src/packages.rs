//! Subscription package catalog.
//!
//! The four tiers and their limit profiles are fixed at compile time. The
//! `packages` table is a display/audit copy of [`CATALOG`], seeded at startup
//! by [`crate::seed_packages`]; quota logic never reads it back.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use utoipa::ToSchema;

/// Subscription tier held by a workshop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "text", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum Tier {
    Demo,
    Basic,
    Premium,
    Pro,
}

/// Resource ceilings granted by a tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct LimitProfile {
    pub max_workers: i32,
    pub max_orders: i32,
    pub max_customers: i32,
    pub max_fittings: i32,
    pub max_order_groups: i32,
}

/// Static description of one tier.
#[derive(Debug, Clone, Copy)]
pub struct CatalogEntry {
    pub tier: Tier,
    pub description: &'static str,
    pub features: &'static [&'static str],
    /// Price in whole currency units
    pub price: i64,
    pub duration_days: i32,
    pub limits: LimitProfile,
}

#[derive(Debug, Error)]
#[error("unknown package tier '{0}'")]
pub struct UnknownTier(pub String);

pub const CATALOG: [CatalogEntry; 4] = [
    CatalogEntry {
        tier: Tier::Demo,
        description: "Free demo offer with limited features.",
        features: &[
            "Up to 5 tailors",
            "50 orders maximum",
            "50 customers maximum",
            "50 fittings",
            "10 order groups",
        ],
        price: 0,
        duration_days: 30,
        limits: LimitProfile {
            max_workers: 5,
            max_orders: 50,
            max_customers: 50,
            max_fittings: 50,
            max_order_groups: 10,
        },
    },
    CatalogEntry {
        tier: Tier::Basic,
        description: "Basic offer for small workshops.",
        features: &[
            "Up to 15 tailors",
            "500 orders maximum",
            "500 customers maximum",
            "100 fittings",
            "50 order groups",
        ],
        price: 10_000,
        duration_days: 30,
        limits: LimitProfile {
            max_workers: 15,
            max_orders: 500,
            max_customers: 500,
            max_fittings: 100,
            max_order_groups: 50,
        },
    },
    CatalogEntry {
        tier: Tier::Premium,
        description: "Premium offer for medium-sized workshops.",
        features: &[
            "Up to 30 tailors",
            "2000 orders maximum",
            "5000 customers maximum",
            "300 fittings",
            "200 order groups",
        ],
        price: 30_000,
        duration_days: 30,
        limits: LimitProfile {
            max_workers: 30,
            max_orders: 2000,
            max_customers: 5000,
            max_fittings: 300,
            max_order_groups: 200,
        },
    },
    CatalogEntry {
        tier: Tier::Pro,
        description: "Pro offer for large workshops.",
        features: &[
            "Up to 100 tailors",
            "10 000 orders maximum",
            "20 000 customers maximum",
            "1000 fittings",
            "500 order groups",
        ],
        price: 80_000,
        duration_days: 30,
        limits: LimitProfile {
            max_workers: 100,
            max_orders: 10_000,
            max_customers: 20_000,
            max_fittings: 1000,
            max_order_groups: 500,
        },
    },
];

impl Tier {
    pub const ALL: [Tier; 4] = [Tier::Demo, Tier::Basic, Tier::Premium, Tier::Pro];

    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Demo => "DEMO",
            Tier::Basic => "BASIC",
            Tier::Premium => "PREMIUM",
            Tier::Pro => "PRO",
        }
    }

    pub fn entry(&self) -> &'static CatalogEntry {
        match self {
            Tier::Demo => &CATALOG[0],
            Tier::Basic => &CATALOG[1],
            Tier::Premium => &CATALOG[2],
            Tier::Pro => &CATALOG[3],
        }
    }

    pub fn limit_profile(&self) -> LimitProfile {
        self.entry().limits
    }

    /// Catalog price, used as the ledger price snapshot when none is given.
    pub fn price(&self) -> Decimal {
        Decimal::from(self.entry().price)
    }

    pub fn duration(&self) -> chrono::Duration {
        chrono::Duration::days(self.entry().duration_days as i64)
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Tier {
    type Err = UnknownTier;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Tier::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| UnknownTier(s.to_string()))
    }
}

/// Look up the limit profile of a tier by name.
pub fn get_limit_profile(name: &str) -> Result<LimitProfile, UnknownTier> {
    name.parse::<Tier>().map(|tier| tier.limit_profile())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_is_indexed_by_tier() {
        for tier in Tier::ALL {
            assert_eq!(tier.entry().tier, tier);
        }
    }

    #[test]
    fn test_limit_profiles() {
        assert_eq!(Tier::Demo.limit_profile().max_workers, 5);
        assert_eq!(Tier::Basic.limit_profile().max_workers, 15);
        assert_eq!(Tier::Premium.limit_profile().max_customers, 5000);
        let pro = Tier::Pro.limit_profile();
        assert_eq!(pro.max_workers, 100);
        assert_eq!(pro.max_orders, 10_000);
        assert_eq!(pro.max_customers, 20_000);
        assert_eq!(pro.max_fittings, 1000);
        assert_eq!(pro.max_order_groups, 500);
    }

    #[test]
    fn test_get_limit_profile_by_name() {
        assert_eq!(get_limit_profile("BASIC").unwrap(), Tier::Basic.limit_profile());
        assert_eq!(get_limit_profile("premium").unwrap(), Tier::Premium.limit_profile());
        let err = get_limit_profile("GOLD").unwrap_err();
        assert_eq!(err.to_string(), "unknown package tier 'GOLD'");
    }

    #[test]
    fn test_price_and_duration() {
        assert_eq!(Tier::Demo.price(), Decimal::ZERO);
        assert_eq!(Tier::Pro.price(), Decimal::from(80_000));
        assert_eq!(Tier::Basic.duration(), chrono::Duration::days(30));
    }

    #[test]
    fn test_tier_serde_is_uppercase() {
        assert_eq!(serde_json::to_string(&Tier::Premium).unwrap(), "\"PREMIUM\"");
        let tier: Tier = serde_json::from_str("\"PRO\"").unwrap();
        assert_eq!(tier, Tier::Pro);
    }
}
