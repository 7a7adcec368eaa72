//! Database repository for internal notifications and queued external messages.

use crate::db::{
    errors::Result,
    models::notifications::{
        ExternalNotificationCreateDBRequest, ExternalNotificationDBResponse, NotificationCreateDBRequest, NotificationDBResponse,
    },
};
use crate::types::{NotificationId, UserId, WorkshopId, abbrev_uuid};
use sqlx::PgConnection;
use tracing::instrument;
use uuid::Uuid;

pub struct Notifications<'c> {
    db: &'c mut PgConnection,
}

impl<'c> Notifications<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    #[instrument(skip(self, requests), fields(count = requests.len()), err)]
    pub async fn create_many(&mut self, requests: &[NotificationCreateDBRequest]) -> Result<u64> {
        let mut inserted = 0;
        for request in requests {
            let result = sqlx::query(
                r#"
                INSERT INTO notifications (id, user_id, severity, category, object_kind, object_id, title, message)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(request.user_id)
            .bind(request.severity)
            .bind(request.category)
            .bind(request.object_kind)
            .bind(request.object_id)
            .bind(&request.title)
            .bind(&request.message)
            .execute(&mut *self.db)
            .await?;
            inserted += result.rows_affected();
        }

        Ok(inserted)
    }

    /// A user's notifications, newest first
    #[instrument(skip(self), fields(user_id = %abbrev_uuid(&user_id)), err)]
    pub async fn list_for_user(&mut self, user_id: UserId, unread_only: bool) -> Result<Vec<NotificationDBResponse>> {
        let notifications = sqlx::query_as::<_, NotificationDBResponse>(
            r#"
            SELECT * FROM notifications
            WHERE user_id = $1 AND (NOT is_read OR NOT $2)
            ORDER BY created_at DESC, id
            "#,
        )
        .bind(user_id)
        .bind(unread_only)
        .fetch_all(&mut *self.db)
        .await?;

        Ok(notifications)
    }

    /// Mark one of the user's notifications read. Returns None if it is not theirs.
    #[instrument(skip(self), fields(user_id = %abbrev_uuid(&user_id), notification_id = %abbrev_uuid(&id)), err)]
    pub async fn mark_read(&mut self, user_id: UserId, id: NotificationId) -> Result<Option<NotificationDBResponse>> {
        let notification = sqlx::query_as::<_, NotificationDBResponse>(
            r#"
            UPDATE notifications SET is_read = TRUE, read_at = COALESCE(read_at, NOW())
            WHERE id = $1 AND user_id = $2
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(user_id)
        .fetch_optional(&mut *self.db)
        .await?;

        Ok(notification)
    }

    #[instrument(skip(self, requests), fields(count = requests.len()), err)]
    pub async fn create_external_many(&mut self, requests: &[ExternalNotificationCreateDBRequest]) -> Result<u64> {
        let mut inserted = 0;
        for request in requests {
            let result = sqlx::query(
                r#"
                INSERT INTO external_notifications (id, customer_id, channel, scheduled_for, title, message)
                VALUES ($1, $2, $3, $4, $5, $6)
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(request.customer_id)
            .bind(request.channel)
            .bind(request.scheduled_for)
            .bind(&request.title)
            .bind(&request.message)
            .execute(&mut *self.db)
            .await?;
            inserted += result.rows_affected();
        }

        Ok(inserted)
    }

    /// Queued messages to the customers of a workshop, newest first
    #[instrument(skip(self), fields(workshop_id = %abbrev_uuid(&workshop_id)), err)]
    pub async fn list_external_for_workshop(&mut self, workshop_id: WorkshopId) -> Result<Vec<ExternalNotificationDBResponse>> {
        let notifications = sqlx::query_as::<_, ExternalNotificationDBResponse>(
            r#"
            SELECT e.* FROM external_notifications e
            JOIN customers c ON c.id = e.customer_id
            WHERE c.workshop_id = $1
            ORDER BY e.created_at DESC, e.id
            "#,
        )
        .bind(workshop_id)
        .fetch_all(&mut *self.db)
        .await?;

        Ok(notifications)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::notifications::{NotificationCategory, ObjectKind, Severity};
    use crate::test_utils::create_test_user;
    use sqlx::PgPool;

    #[sqlx::test]
    #[test_log::test]
    async fn test_mark_read_is_scoped_to_owner(pool: PgPool) {
        let reader = create_test_user(&pool, "reader@example.com").await;
        let other = create_test_user(&pool, "other@example.com").await;
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Notifications::new(&mut conn);

        let request = NotificationCreateDBRequest {
            user_id: reader.id,
            severity: Severity::Info,
            category: NotificationCategory::WorkshopCreation,
            object_kind: Some(ObjectKind::Workshop),
            object_id: Some(Uuid::new_v4()),
            title: "Workshop created".to_string(),
            message: "Your workshop 'X' was created successfully.".to_string(),
        };
        assert_eq!(repo.create_many(std::slice::from_ref(&request)).await.unwrap(), 1);

        let unread = repo.list_for_user(reader.id, true).await.unwrap();
        assert_eq!(unread.len(), 1);
        assert_eq!(unread[0].object_kind, Some(ObjectKind::Workshop));

        assert!(repo.mark_read(other.id, unread[0].id).await.unwrap().is_none());
        let read = repo.mark_read(reader.id, unread[0].id).await.unwrap().unwrap();
        assert!(read.is_read);
        assert!(read.read_at.is_some());

        assert!(repo.list_for_user(reader.id, true).await.unwrap().is_empty());
        assert_eq!(repo.list_for_user(reader.id, false).await.unwrap().len(), 1);
    }
}
