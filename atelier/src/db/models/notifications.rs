//! Database models for internal and external notifications.

use crate::types::{CustomerId, NotificationId, UserId};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "text", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Error,
    Success,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "text", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationCategory {
    WorkshopCreation,
    CustomerCreation,
    OrderCreation,
    OrderUpdate,
    OrderDeletion,
    OrderGroupCreation,
    FittingCreation,
    AuthorisationAccept,
    AuthorisationReject,
}

/// Kind of object a notification links to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "text", rename_all = "PascalCase")]
pub enum ObjectKind {
    Setting,
    Worker,
    Customer,
    Order,
    OrderGroup,
    Fitting,
    Workshop,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "text", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    Email,
    Sms,
    Push,
}

/// Database request for persisting one internal notification
#[derive(Debug, Clone, PartialEq)]
pub struct NotificationCreateDBRequest {
    pub user_id: UserId,
    pub severity: Severity,
    pub category: NotificationCategory,
    pub object_kind: Option<ObjectKind>,
    pub object_id: Option<Uuid>,
    pub title: String,
    pub message: String,
}

/// Database response for an internal notification
#[derive(Debug, Clone, FromRow)]
pub struct NotificationDBResponse {
    pub id: NotificationId,
    pub user_id: UserId,
    pub severity: Severity,
    pub category: Option<NotificationCategory>,
    pub object_kind: Option<ObjectKind>,
    pub object_id: Option<Uuid>,
    pub title: String,
    pub message: String,
    pub is_read: bool,
    pub read_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Database request for queueing a message to a customer
#[derive(Debug, Clone, PartialEq)]
pub struct ExternalNotificationCreateDBRequest {
    pub customer_id: CustomerId,
    pub channel: Channel,
    pub scheduled_for: Option<NaiveDate>,
    pub title: String,
    pub message: String,
}

/// Database response for a queued customer message
#[derive(Debug, Clone, FromRow)]
pub struct ExternalNotificationDBResponse {
    pub id: Uuid,
    pub customer_id: CustomerId,
    pub channel: Channel,
    pub scheduled_for: Option<NaiveDate>,
    pub title: String,
    pub message: String,
    pub is_sent: bool,
    pub created_at: DateTime<Utc>,
}
