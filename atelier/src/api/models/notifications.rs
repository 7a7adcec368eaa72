//! API models for notifications.

use crate::db::models::notifications::{
    Channel, ExternalNotificationDBResponse, NotificationCategory, NotificationDBResponse, ObjectKind, Severity,
};
use crate::types::{CustomerId, NotificationId};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct ListNotificationsQuery {
    /// Only unread notifications (default: true)
    pub unread_only: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct NotificationResponse {
    #[schema(value_type = String, format = "uuid")]
    pub id: NotificationId,
    pub severity: Severity,
    pub category: Option<NotificationCategory>,
    pub object_kind: Option<ObjectKind>,
    #[schema(value_type = Option<String>, format = "uuid")]
    pub object_id: Option<Uuid>,
    pub title: String,
    pub message: String,
    pub is_read: bool,
    pub read_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<NotificationDBResponse> for NotificationResponse {
    fn from(db: NotificationDBResponse) -> Self {
        Self {
            id: db.id,
            severity: db.severity,
            category: db.category,
            object_kind: db.object_kind,
            object_id: db.object_id,
            title: db.title,
            message: db.message,
            is_read: db.is_read,
            read_at: db.read_at,
            created_at: db.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ExternalNotificationResponse {
    #[schema(value_type = String, format = "uuid")]
    pub id: Uuid,
    #[schema(value_type = String, format = "uuid")]
    pub customer_id: CustomerId,
    pub channel: Channel,
    pub scheduled_for: Option<NaiveDate>,
    pub title: String,
    pub message: String,
    pub is_sent: bool,
    pub created_at: DateTime<Utc>,
}

impl From<ExternalNotificationDBResponse> for ExternalNotificationResponse {
    fn from(db: ExternalNotificationDBResponse) -> Self {
        Self {
            id: db.id,
            customer_id: db.customer_id,
            channel: db.channel,
            scheduled_for: db.scheduled_for,
            title: db.title,
            message: db.message,
            is_sent: db.is_sent,
            created_at: db.created_at,
        }
    }
}
