//! Notification database entity.

use chrono::{DateTime, Utc};
use domain::models::NotificationKind;
use sqlx::FromRow;
use uuid::Uuid;

/// Database entity for notifications table.
#[derive(Debug, Clone, FromRow)]
pub struct NotificationEntity {
    pub id: i64,
    pub notification_id: Uuid,
    pub recipient_id: Uuid,
    pub emergency_id: Option<Uuid>,
    pub kind: String,
    pub title: String,
    pub message: String,
    pub is_read: bool,
    pub read_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<NotificationEntity> for domain::models::Notification {
    fn from(entity: NotificationEntity) -> Self {
        Self {
            id: entity.id,
            notification_id: entity.notification_id,
            recipient_id: entity.recipient_id,
            emergency_id: entity.emergency_id,
            kind: NotificationKind::parse(&entity.kind)
                .unwrap_or(NotificationKind::NearbyEmergency),
            title: entity.title,
            message: entity.message,
            is_read: entity.is_read,
            created_at: entity.created_at,
        }
    }
}
