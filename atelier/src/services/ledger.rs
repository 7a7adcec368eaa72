//! Package history ledger.
//!
//! Assigning a tier appends an active ledger entry, deactivates every earlier
//! one and re-derives the workshop's quota ceilings, all in one transaction.
//! The functions take a connection so workshop creation can run the initial
//! DEMO assignment inside its own transaction; they open a savepoint on it.

use bon::Builder;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use sqlx::{Connection, PgConnection};
use tracing::{info, instrument};

use crate::db::errors::DbError;
use crate::db::handlers::{PackageHistories, Settings, Workshops};
use crate::db::models::package_histories::{PackageHistoryCreateDBRequest, PackageHistoryDBResponse};
use crate::errors::{Error, Result};
use crate::packages::Tier;
use crate::services::{ensure_workshop, haberdashery, quota};
use crate::types::{WorkshopId, abbrev_uuid};

/// A request to move a workshop onto a tier
#[derive(Debug, Clone, Builder)]
pub struct TierAssignment {
    pub workshop_id: WorkshopId,
    pub tier: Tier,
    /// Price snapshot; the catalog price when absent
    pub price: Option<Decimal>,
    pub payment_info: Option<serde_json::Value>,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
}

/// Make `tier` the workshop's active package and re-apply its limits.
///
/// Fails with NotFound for an unknown workshop and with Conflict when the same tier was
/// already assigned to the workshop with the same start date. On failure nothing changes.
#[instrument(skip(conn, assignment), fields(workshop_id = %abbrev_uuid(&assignment.workshop_id), tier = %assignment.tier), err)]
pub async fn assign_tier(conn: &mut PgConnection, assignment: &TierAssignment) -> Result<PackageHistoryDBResponse> {
    let workshop_id = assignment.workshop_id;
    let mut tx = conn.begin().await?;

    // Serializes concurrent assignments for the same workshop
    if !Workshops::new(&mut tx).lock(workshop_id).await? {
        return Err(Error::not_found("Workshop", workshop_id));
    }

    let request = PackageHistoryCreateDBRequest {
        workshop_id,
        name: assignment.tier,
        price: assignment.price.unwrap_or_else(|| assignment.tier.price()),
        payment_info: assignment.payment_info.clone(),
        start_date: assignment.start_date,
        end_date: assignment.end_date,
    };

    let entry = {
        let mut histories = PackageHistories::new(&mut tx);
        let replaced = histories.deactivate_all(workshop_id).await?;
        let entry = histories.insert_active(&request).await.map_err(|e| match e {
            DbError::UniqueViolation { ref constraint, .. } if constraint.as_deref() == Some("package_histories_window_unique") => {
                Error::Conflict {
                    message: format!(
                        "Package {} is already assigned to this workshop starting {}",
                        assignment.tier, assignment.start_date
                    ),
                }
            }
            other => Error::Database(other),
        })?;
        info!(replaced, "Assigned package {} to workshop", assignment.tier);
        entry
    };

    Settings::new(&mut tx).create_if_missing(workshop_id).await?;
    quota::apply_active_limits(&mut tx, workshop_id).await?;
    haberdashery::ensure_haberdashery(&mut tx, workshop_id).await?;

    tx.commit().await?;
    Ok(entry)
}

/// The workshop's active ledger entry. NotFound when there is none; callers fall back to DEMO.
#[instrument(skip(conn), fields(workshop_id = %abbrev_uuid(&workshop_id)), err)]
pub async fn get_active_tier(conn: &mut PgConnection, workshop_id: WorkshopId) -> Result<PackageHistoryDBResponse> {
    PackageHistories::new(conn)
        .get_active(workshop_id)
        .await?
        .ok_or_else(|| Error::not_found("Active package for workshop", workshop_id))
}

/// Full ledger of a workshop, newest first
#[instrument(skip(conn), fields(workshop_id = %abbrev_uuid(&workshop_id)), err)]
pub async fn list_history(conn: &mut PgConnection, workshop_id: WorkshopId) -> Result<Vec<PackageHistoryDBResponse>> {
    ensure_workshop(&mut *conn, workshop_id).await?;
    Ok(PackageHistories::new(conn).list_for_workshop(workshop_id).await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::handlers::Settings;
    use crate::test_utils::create_test_workshop;
    use sqlx::PgPool;
    use uuid::Uuid;

    fn jan(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, day).unwrap()
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_assign_pro_replaces_demo(pool: PgPool) {
        let workshop = create_test_workshop(&pool, "Atelier Pro").await;
        let mut conn = pool.acquire().await.unwrap();

        let demo = assign_tier(
            &mut conn,
            &TierAssignment::builder().workshop_id(workshop.id).tier(Tier::Demo).start_date(jan(1)).build(),
        )
        .await
        .unwrap();
        let pro = assign_tier(
            &mut conn,
            &TierAssignment::builder().workshop_id(workshop.id).tier(Tier::Pro).start_date(jan(2)).build(),
        )
        .await
        .unwrap();

        assert!(pro.is_active);
        assert_eq!(pro.price, Decimal::from(80_000));

        let history = list_history(&mut conn, workshop.id).await.unwrap();
        let active: Vec<_> = history.iter().filter(|h| h.is_active).collect();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id, pro.id);
        assert!(history.iter().any(|h| h.id == demo.id && !h.is_active));

        let setting = Settings::new(&mut conn).get(workshop.id).await.unwrap().unwrap();
        assert_eq!(setting.max_workers, 100);
        assert_eq!(setting.limits(), Tier::Pro.limit_profile());
        assert_eq!(setting.package_history_id, Some(pro.id));
        assert_eq!(setting.start_date, Some(jan(2)));
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_exactly_one_active_after_many_assignments(pool: PgPool) {
        let workshop = create_test_workshop(&pool, "Atelier Churn").await;
        let mut conn = pool.acquire().await.unwrap();

        let tiers = [Tier::Demo, Tier::Basic, Tier::Premium, Tier::Basic, Tier::Pro, Tier::Demo];
        for (day, tier) in tiers.into_iter().enumerate() {
            assign_tier(
                &mut conn,
                &TierAssignment::builder()
                    .workshop_id(workshop.id)
                    .tier(tier)
                    .start_date(jan(day as u32 + 1))
                    .build(),
            )
            .await
            .unwrap();

            let history = list_history(&mut conn, workshop.id).await.unwrap();
            assert_eq!(history.iter().filter(|h| h.is_active).count(), 1);
            assert_eq!(get_active_tier(&mut conn, workshop.id).await.unwrap().name, tier);
        }
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_duplicate_window_is_conflict_and_changes_nothing(pool: PgPool) {
        let workshop = create_test_workshop(&pool, "Atelier Twice").await;
        let mut conn = pool.acquire().await.unwrap();
        let basic = TierAssignment::builder()
            .workshop_id(workshop.id)
            .tier(Tier::Basic)
            .start_date(jan(1))
            .build();

        let first = assign_tier(&mut conn, &basic).await.unwrap();
        let err = assign_tier(&mut conn, &basic).await.unwrap_err();
        assert!(matches!(err, Error::Conflict { .. }));

        // The rollback restored the previous active entry
        let active = get_active_tier(&mut conn, workshop.id).await.unwrap();
        assert_eq!(active.id, first.id);
        assert_eq!(list_history(&mut conn, workshop.id).await.unwrap().len(), 1);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_unknown_workshop_is_not_found(pool: PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let err = assign_tier(
            &mut conn,
            &TierAssignment::builder().workshop_id(Uuid::new_v4()).tier(Tier::Basic).start_date(jan(1)).build(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, Error::NotFound { .. }));
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_no_active_tier_is_not_found(pool: PgPool) {
        let workshop = create_test_workshop(&pool, "Atelier Bare").await;
        let mut conn = pool.acquire().await.unwrap();
        let err = get_active_tier(&mut conn, workshop.id).await.unwrap_err();
        assert!(matches!(err, Error::NotFound { .. }));
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_price_and_payment_info_are_snapshotted(pool: PgPool) {
        let workshop = create_test_workshop(&pool, "Atelier Discount").await;
        let mut conn = pool.acquire().await.unwrap();
        let entry = assign_tier(
            &mut conn,
            &TierAssignment::builder()
                .workshop_id(workshop.id)
                .tier(Tier::Premium)
                .price(Decimal::from(25_000))
                .payment_info(serde_json::json!({"reference": "INV-42"}))
                .start_date(jan(1))
                .end_date(jan(31))
                .build(),
        )
        .await
        .unwrap();

        assert_eq!(entry.price, Decimal::from(25_000));
        assert_eq!(entry.payment_info, Some(serde_json::json!({"reference": "INV-42"})));
        assert_eq!(entry.end_date, Some(jan(31)));
    }
}
