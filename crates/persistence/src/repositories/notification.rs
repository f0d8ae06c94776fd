//! Notification repository implementation.

use chrono::{DateTime, Utc};
use domain::models::NewNotification;
use sqlx::PgPool;
use uuid::Uuid;

use crate::entities::NotificationEntity;
use crate::metrics::QueryTimer;

/// Repository for notification database operations.
#[derive(Clone)]
pub struct NotificationRepository {
    pool: PgPool,
}

impl NotificationRepository {
    /// Creates a new notification repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Stores a batch of notifications atomically.
    pub async fn create_many(
        &self,
        notifications: &[NewNotification],
    ) -> Result<Vec<NotificationEntity>, sqlx::Error> {
        if notifications.is_empty() {
            return Ok(Vec::new());
        }

        let timer = QueryTimer::new("create_notifications");
        let mut tx = self.pool.begin().await?;
        let mut stored = Vec::with_capacity(notifications.len());

        for n in notifications {
            let entity = sqlx::query_as::<_, NotificationEntity>(
                r#"
                INSERT INTO notifications (recipient_id, emergency_id, kind, title, message)
                VALUES ($1, $2, $3, $4, $5)
                RETURNING *
                "#,
            )
            .bind(n.recipient_id)
            .bind(n.emergency_id)
            .bind(n.kind.as_str())
            .bind(&n.title)
            .bind(&n.message)
            .fetch_one(&mut *tx)
            .await?;
            stored.push(entity);
        }

        tx.commit().await?;
        timer.record();
        Ok(stored)
    }

    /// Lists a recipient's notifications, newest first.
    ///
    /// `before` is the `(created_at, id)` of the last row of the previous page.
    pub async fn list(
        &self,
        recipient_id: Uuid,
        unread_only: bool,
        before: Option<(DateTime<Utc>, i64)>,
        limit: i64,
    ) -> Result<Vec<NotificationEntity>, sqlx::Error> {
        let (before_ts, before_id) = before.unzip();

        sqlx::query_as::<_, NotificationEntity>(
            r#"
            SELECT * FROM notifications
            WHERE recipient_id = $1
              AND ($2 = FALSE OR is_read = FALSE)
              AND ($3::TIMESTAMPTZ IS NULL OR (created_at, id) < ($3, $4))
            ORDER BY created_at DESC, id DESC
            LIMIT $5
            "#,
        )
        .bind(recipient_id)
        .bind(unread_only)
        .bind(before_ts)
        .bind(before_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
    }

    /// Number of unread notifications for a recipient.
    pub async fn count_unread(&self, recipient_id: Uuid) -> Result<i64, sqlx::Error> {
        let result: (i64,) = sqlx::query_as(
            r#"
            SELECT COUNT(*) FROM notifications
            WHERE recipient_id = $1 AND is_read = FALSE
            "#,
        )
        .bind(recipient_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(result.0)
    }

    /// Marks one of the recipient's notifications as read.
    pub async fn mark_read(
        &self,
        notification_id: Uuid,
        recipient_id: Uuid,
    ) -> Result<Option<NotificationEntity>, sqlx::Error> {
        sqlx::query_as::<_, NotificationEntity>(
            r#"
            UPDATE notifications
            SET is_read = TRUE, read_at = COALESCE(read_at, NOW())
            WHERE notification_id = $1 AND recipient_id = $2
            RETURNING *
            "#,
        )
        .bind(notification_id)
        .bind(recipient_id)
        .fetch_optional(&self.pool)
        .await
    }

    /// Marks all of the recipient's notifications as read.
    pub async fn mark_all_read(&self, recipient_id: Uuid) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE notifications
            SET is_read = TRUE, read_at = NOW()
            WHERE recipient_id = $1 AND is_read = FALSE
            "#,
        )
        .bind(recipient_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    /// Deletes up to `batch_size` read notifications older than `retention_days`.
    pub async fn delete_read_older_than(
        &self,
        retention_days: u32,
        batch_size: i64,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            r#"
            WITH to_delete AS (
                SELECT id FROM notifications
                WHERE is_read = TRUE
                  AND created_at < NOW() - ($1 || ' days')::INTERVAL
                LIMIT $2
            )
            DELETE FROM notifications
            WHERE id IN (SELECT id FROM to_delete)
            "#,
        )
        .bind(retention_days as i32)
        .bind(batch_size)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }
}
