//! Notification side effects.
//!
//! Services describe what happened as [`NotificationEvent`]s and hand them to
//! [`Notifier::dispatch`] once their transaction has committed. The notifier
//! resolves recipients, renders titles and messages, and passes the resulting
//! [`Outbox`] to a [`NotificationSink`]. Delivery is best effort: a failure is
//! logged at `warn` and never reaches the caller, so a committed change is
//! never reported as failed because of its notifications.

use std::sync::Arc;

use sqlx::{PgConnection, PgPool};
use tracing::{debug, instrument, warn};

use crate::db::handlers::workers::WorkerFilter;
use crate::db::handlers::{Customers, Fittings, Notifications, OrderGroups, Orders, Repository, Workers, Workshops};
use crate::db::models::notifications::{
    Channel, ExternalNotificationCreateDBRequest, NotificationCategory, NotificationCreateDBRequest, ObjectKind, Severity,
};
use crate::db::models::orders::OrderDBResponse;
use crate::types::{Capability, CustomerId, FittingId, OrderGroupId, OrderId, UserId, WorkerId, WorkshopId};

/// The order transitions that produce notifications
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderChange {
    InProgress,
    Completed,
    Cancelled,
    Paid,
    Deleted,
}

/// Something that happened and that users (or customers) should hear about
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotificationEvent {
    AuthorizationGranted {
        workshop_id: WorkshopId,
        worker_id: WorkerId,
        capability: Capability,
    },
    AuthorizationRevoked {
        workshop_id: WorkshopId,
        worker_id: WorkerId,
        capability: Capability,
    },
    WorkshopCreated {
        workshop_id: WorkshopId,
    },
    CustomerCreated {
        customer_id: CustomerId,
    },
    OrderCreated {
        order_id: OrderId,
    },
    OrderUpdated {
        order_id: OrderId,
        change: OrderChange,
    },
    OrderGroupCreated {
        order_group_id: OrderGroupId,
    },
    FittingScheduled {
        fitting_id: FittingId,
    },
}

/// Rendered notifications, ready to be persisted
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Outbox {
    pub internal: Vec<NotificationCreateDBRequest>,
    pub external: Vec<ExternalNotificationCreateDBRequest>,
}

impl Outbox {
    pub fn is_empty(&self) -> bool {
        self.internal.is_empty() && self.external.is_empty()
    }

    fn notify(
        &mut self,
        recipients: &[UserId],
        severity: Severity,
        category: NotificationCategory,
        object: Option<(ObjectKind, uuid::Uuid)>,
        title: &str,
        message: &str,
    ) {
        for user_id in recipients {
            self.internal.push(NotificationCreateDBRequest {
                user_id: *user_id,
                severity,
                category,
                object_kind: object.map(|(kind, _)| kind),
                object_id: object.map(|(_, id)| id),
                title: title.to_string(),
                message: message.to_string(),
            });
        }
    }
}

/// Destination for rendered notifications
#[async_trait::async_trait]
pub trait NotificationSink: Send + Sync {
    async fn deliver(&self, outbox: &Outbox) -> anyhow::Result<()>;
}

/// Persists notifications to the `notifications` and `external_notifications` tables
pub struct PgNotificationSink {
    pool: PgPool,
}

impl PgNotificationSink {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl NotificationSink for PgNotificationSink {
    async fn deliver(&self, outbox: &Outbox) -> anyhow::Result<()> {
        let mut tx = self.pool.begin().await?;
        {
            let mut repo = Notifications::new(&mut tx);
            repo.create_many(&outbox.internal).await?;
            repo.create_external_many(&outbox.external).await?;
        }
        tx.commit().await?;
        Ok(())
    }
}

/// Renders events and hands them to a sink
#[derive(Clone)]
pub struct Notifier {
    pool: PgPool,
    sink: Arc<dyn NotificationSink>,
    enabled: bool,
}

impl Notifier {
    pub fn new(pool: PgPool, sink: Arc<dyn NotificationSink>, enabled: bool) -> Self {
        Self { pool, sink, enabled }
    }

    /// A notifier that persists to the application database
    pub fn postgres(pool: PgPool, enabled: bool) -> Self {
        let sink = Arc::new(PgNotificationSink::new(pool.clone()));
        Self::new(pool, sink, enabled)
    }

    /// Render and deliver the events. Never fails; problems are logged.
    #[instrument(skip(self, events), fields(count = events.len()))]
    pub async fn dispatch(&self, events: Vec<NotificationEvent>) {
        if !self.enabled || events.is_empty() {
            return;
        }

        let mut conn = match self.pool.acquire().await {
            Ok(conn) => conn,
            Err(e) => {
                warn!(error = %e, "Could not acquire a connection to render notifications, dropping them");
                return;
            }
        };

        let mut outbox = Outbox::default();
        for event in &events {
            if let Err(e) = render(&mut conn, event, &mut outbox).await {
                warn!(error = %e, ?event, "Failed to render notification, skipping");
            }
        }

        if outbox.is_empty() {
            debug!("No recipients for notification events");
            return;
        }

        if let Err(e) = self.sink.deliver(&outbox).await {
            warn!(error = %e, internal = outbox.internal.len(), external = outbox.external.len(), "Failed to deliver notifications");
        }
    }
}

/// Recipients in first-seen order, each once
fn distinct(users: impl IntoIterator<Item = UserId>) -> Vec<UserId> {
    let mut seen = Vec::new();
    for user in users {
        if !seen.contains(&user) {
            seen.push(user);
        }
    }
    seen
}

async fn owner_users(conn: &mut PgConnection, workshop_id: WorkshopId) -> anyhow::Result<Vec<UserId>> {
    let owners = Workers::new(conn).list_owners(workshop_id).await?;
    Ok(owners.into_iter().map(|w| w.user_id).collect())
}

async fn worker_user(conn: &mut PgConnection, worker_id: WorkerId) -> anyhow::Result<Option<UserId>> {
    let worker = Workers::new(conn).get_by_id(worker_id).await?;
    Ok(worker.map(|w| w.user_id))
}

/// The order's assigned worker followed by the workshop owners
async fn worker_and_owners(conn: &mut PgConnection, order: &OrderDBResponse) -> anyhow::Result<Vec<UserId>> {
    let worker = worker_user(conn, order.worker_id).await?;
    let owners = owner_users(conn, order.workshop_id).await?;
    Ok(distinct(worker.into_iter().chain(owners)))
}

async fn workshop_name(conn: &mut PgConnection, workshop_id: WorkshopId) -> anyhow::Result<String> {
    let workshop = Workshops::new(conn)
        .get_by_id(workshop_id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("workshop {workshop_id} not found"))?;
    Ok(workshop.name)
}

async fn load_order(conn: &mut PgConnection, order_id: OrderId) -> anyhow::Result<OrderDBResponse> {
    Orders::new(conn)
        .get_by_id(order_id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("order {order_id} not found"))
}

async fn render(conn: &mut PgConnection, event: &NotificationEvent, outbox: &mut Outbox) -> anyhow::Result<()> {
    match *event {
        NotificationEvent::AuthorizationGranted {
            workshop_id,
            worker_id,
            capability,
        } => {
            let name = workshop_name(conn, workshop_id).await?;
            let recipients: Vec<UserId> = worker_user(conn, worker_id).await?.into_iter().collect();
            outbox.notify(
                &recipients,
                Severity::Success,
                NotificationCategory::AuthorisationAccept,
                Some((ObjectKind::Setting, workshop_id)),
                &format!("{} authorization", capability.label()),
                &format!("You have been authorized to {} of the workshop '{name}'.", capability.describe()),
            );
        }
        NotificationEvent::AuthorizationRevoked {
            workshop_id,
            worker_id,
            capability,
        } => {
            let name = workshop_name(conn, workshop_id).await?;
            let recipients: Vec<UserId> = worker_user(conn, worker_id).await?.into_iter().collect();
            outbox.notify(
                &recipients,
                Severity::Error,
                NotificationCategory::AuthorisationReject,
                Some((ObjectKind::Setting, workshop_id)),
                &format!("{} authorization withdrawn", capability.label()),
                &format!("You are no longer authorized to {} of the workshop '{name}'.", capability.describe()),
            );
        }
        NotificationEvent::WorkshopCreated { workshop_id } => {
            let name = workshop_name(conn, workshop_id).await?;
            let owners = owner_users(conn, workshop_id).await?;
            outbox.notify(
                &owners,
                Severity::Info,
                NotificationCategory::WorkshopCreation,
                Some((ObjectKind::Workshop, workshop_id)),
                "Workshop created",
                &format!("Your workshop '{name}' was created successfully."),
            );
        }
        NotificationEvent::CustomerCreated { customer_id } => {
            let customer = Customers::new(conn)
                .get_by_id(customer_id)
                .await?
                .ok_or_else(|| anyhow::anyhow!("customer {customer_id} not found"))?;
            let workers = Workers::new(conn)
                .list(&WorkerFilter::new(customer.workshop_id, 0, i64::MAX))
                .await?;
            let recipients = distinct(workers.into_iter().map(|w| w.user_id));
            outbox.notify(
                &recipients,
                Severity::Info,
                NotificationCategory::CustomerCreation,
                Some((ObjectKind::Customer, customer_id)),
                "New customer",
                &format!(
                    "A new customer '{} {}' was added to your workshop (nickname: '{}').",
                    customer.first_name, customer.last_name, customer.nickname
                ),
            );
        }
        NotificationEvent::OrderCreated { order_id } => {
            let order = load_order(conn, order_id).await?;
            let recipients: Vec<UserId> = worker_user(conn, order.worker_id).await?.into_iter().collect();
            outbox.notify(
                &recipients,
                Severity::Info,
                NotificationCategory::OrderCreation,
                Some((ObjectKind::Order, order_id)),
                "New order",
                &format!("A new order '{}' was created for you.", order.number),
            );
            outbox.external.push(ExternalNotificationCreateDBRequest {
                customer_id: order.customer_id,
                channel: Channel::Email,
                scheduled_for: None,
                title: "Order created".to_string(),
                message: format!(
                    "Your order '{}' was created successfully. Please check your order details.",
                    order.number
                ),
            });
        }
        NotificationEvent::OrderUpdated { order_id, change } => {
            let order = load_order(conn, order_id).await?;
            let object = Some((ObjectKind::Order, order_id));
            match change {
                OrderChange::Deleted => {
                    let recipients: Vec<UserId> = worker_user(conn, order.worker_id).await?.into_iter().collect();
                    outbox.notify(
                        &recipients,
                        Severity::Error,
                        NotificationCategory::OrderDeletion,
                        object,
                        "Order deleted",
                        &format!("Order '{}' was deleted.", order.number),
                    );
                }
                OrderChange::Completed => {
                    let recipients = worker_and_owners(conn, &order).await?;
                    outbox.notify(
                        &recipients,
                        Severity::Success,
                        NotificationCategory::OrderUpdate,
                        object,
                        "Order completed",
                        &format!("Order '{}' was marked as completed.", order.number),
                    );
                }
                OrderChange::InProgress => {
                    let recipients = worker_and_owners(conn, &order).await?;
                    outbox.notify(
                        &recipients,
                        Severity::Info,
                        NotificationCategory::OrderUpdate,
                        object,
                        "Order in progress",
                        &format!("Order '{}' is being processed.", order.number),
                    );
                }
                OrderChange::Cancelled => {
                    let recipients = worker_and_owners(conn, &order).await?;
                    outbox.notify(
                        &recipients,
                        Severity::Warning,
                        NotificationCategory::OrderUpdate,
                        object,
                        "Order cancelled",
                        &format!("Order '{}' was cancelled.", order.number),
                    );
                }
                OrderChange::Paid => {
                    let recipients = worker_and_owners(conn, &order).await?;
                    outbox.notify(
                        &recipients,
                        Severity::Success,
                        NotificationCategory::OrderUpdate,
                        object,
                        "Order paid",
                        &format!("Order '{}' was marked as paid.", order.number),
                    );
                }
            }
        }
        NotificationEvent::OrderGroupCreated { order_group_id } => {
            let group = OrderGroups::new(conn)
                .get_by_id(order_group_id)
                .await?
                .ok_or_else(|| anyhow::anyhow!("order group {order_group_id} not found"))?;
            let mut users = Vec::new();
            for order_id in &group.order_ids {
                let order = load_order(conn, *order_id).await?;
                if let Some(user) = worker_user(conn, order.worker_id).await? {
                    users.push(user);
                }
            }
            outbox.notify(
                &distinct(users),
                Severity::Info,
                NotificationCategory::OrderGroupCreation,
                Some((ObjectKind::OrderGroup, order_group_id)),
                "Order group created",
                &format!("A new order group '{}' was created for you.", group.number),
            );
        }
        NotificationEvent::FittingScheduled { fitting_id } => {
            let fitting = Fittings::new(conn)
                .get_by_id(fitting_id)
                .await?
                .ok_or_else(|| anyhow::anyhow!("fitting {fitting_id} not found"))?;
            let order = load_order(conn, fitting.order_id).await?;
            let recipients = worker_and_owners(conn, &order).await?;
            outbox.notify(
                &recipients,
                Severity::Info,
                NotificationCategory::FittingCreation,
                Some((ObjectKind::Fitting, fitting_id)),
                "New fitting",
                &format!("A new fitting was scheduled for order '{}'.", order.number),
            );
            outbox.external.push(ExternalNotificationCreateDBRequest {
                customer_id: order.customer_id,
                channel: Channel::Email,
                scheduled_for: Some(fitting.scheduled_at.date_naive()),
                title: "Fitting scheduled".to_string(),
                message: format!(
                    "A fitting was scheduled for your order '{}'. Please check the fitting details.",
                    order.number
                ),
            });
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::handlers::Notifications;
    use crate::db::models::workers::WorkerCreateDBRequest;
    use crate::test_utils::{FailingSink, RecordingSink, create_test_user, create_test_workshop};

    #[test]
    fn test_distinct_keeps_first_occurrence_order() {
        let a = uuid::Uuid::new_v4();
        let b = uuid::Uuid::new_v4();
        assert_eq!(distinct([a, b, a, b]), vec![a, b]);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_grant_event_renders_for_the_worker(pool: PgPool) {
        let workshop = create_test_workshop(&pool, "Atelier Render").await;
        let user = create_test_user(&pool, "render@example.com").await;
        let worker = {
            let mut conn = pool.acquire().await.unwrap();
            Workers::new(&mut conn)
                .create(&WorkerCreateDBRequest::member(user.id, workshop.id))
                .await
                .unwrap()
        };

        let sink = Arc::new(RecordingSink::default());
        let notifier = Notifier::new(pool.clone(), sink.clone(), true);
        notifier
            .dispatch(vec![NotificationEvent::AuthorizationGranted {
                workshop_id: workshop.id,
                worker_id: worker.id,
                capability: Capability::Customer,
            }])
            .await;

        let delivered = sink.internal();
        assert_eq!(delivered.len(), 1);
        assert_eq!(delivered[0].user_id, user.id);
        assert_eq!(delivered[0].severity, Severity::Success);
        assert_eq!(delivered[0].category, NotificationCategory::AuthorisationAccept);
        assert_eq!(delivered[0].title, "Customer authorization");
        assert_eq!(
            delivered[0].message,
            "You have been authorized to view, add and edit the customer list of the workshop 'Atelier Render'."
        );
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_disabled_notifier_delivers_nothing(pool: PgPool) {
        let workshop = create_test_workshop(&pool, "Atelier Quiet").await;
        let sink = Arc::new(RecordingSink::default());
        let notifier = Notifier::new(pool.clone(), sink.clone(), false);

        notifier
            .dispatch(vec![NotificationEvent::WorkshopCreated { workshop_id: workshop.id }])
            .await;
        assert!(sink.internal().is_empty());
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_unresolvable_event_is_skipped(pool: PgPool) {
        let sink = Arc::new(RecordingSink::default());
        let notifier = Notifier::new(pool.clone(), sink.clone(), true);

        notifier
            .dispatch(vec![NotificationEvent::OrderCreated {
                order_id: uuid::Uuid::new_v4(),
            }])
            .await;
        assert!(sink.internal().is_empty());
        assert!(sink.external().is_empty());
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_sink_failure_is_swallowed(pool: PgPool) {
        let workshop = create_test_workshop(&pool, "Atelier Failing").await;
        let owner = create_test_user(&pool, "owner@example.com").await;
        {
            let mut conn = pool.acquire().await.unwrap();
            Workers::new(&mut conn)
                .create(&WorkerCreateDBRequest::owner(owner.id, workshop.id))
                .await
                .unwrap();
        }

        let notifier = Notifier::new(pool.clone(), Arc::new(FailingSink), true);
        // Returns normally even though the sink errors
        notifier
            .dispatch(vec![NotificationEvent::WorkshopCreated { workshop_id: workshop.id }])
            .await;
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_postgres_sink_persists(pool: PgPool) {
        let workshop = create_test_workshop(&pool, "Atelier Persist").await;
        let owner = create_test_user(&pool, "persist@example.com").await;
        {
            let mut conn = pool.acquire().await.unwrap();
            Workers::new(&mut conn)
                .create(&WorkerCreateDBRequest::owner(owner.id, workshop.id))
                .await
                .unwrap();
        }

        Notifier::postgres(pool.clone(), true)
            .dispatch(vec![NotificationEvent::WorkshopCreated { workshop_id: workshop.id }])
            .await;

        let mut conn = pool.acquire().await.unwrap();
        let stored = Notifications::new(&mut conn).list_for_user(owner.id, true).await.unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].message, "Your workshop 'Atelier Persist' was created successfully.");
        assert_eq!(stored[0].object_id, Some(workshop.id));
    }
}
