//! In-app notification domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stored notification for a single recipient.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: i64,
    pub notification_id: Uuid,
    pub recipient_id: Uuid,
    pub emergency_id: Option<Uuid>,
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

/// Why a notification was sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    /// An emergency was reported within range of an operator
    NearbyEmergency,
    /// An operator accepted the reporter's emergency
    EmergencyAccepted,
    /// An operator reported a finding
    FindingReported,
    EmergencyCompleted,
    EmergencyResolved,
}

impl NotificationKind {
    /// Converts to database string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::NearbyEmergency => "nearby_emergency",
            NotificationKind::EmergencyAccepted => "emergency_accepted",
            NotificationKind::FindingReported => "finding_reported",
            NotificationKind::EmergencyCompleted => "emergency_completed",
            NotificationKind::EmergencyResolved => "emergency_resolved",
        }
    }

    /// Parses from database string representation.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "nearby_emergency" => Some(NotificationKind::NearbyEmergency),
            "emergency_accepted" => Some(NotificationKind::EmergencyAccepted),
            "finding_reported" => Some(NotificationKind::FindingReported),
            "emergency_completed" => Some(NotificationKind::EmergencyCompleted),
            "emergency_resolved" => Some(NotificationKind::EmergencyResolved),
            _ => None,
        }
    }
}

impl std::fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A notification that has not been stored yet.
#[derive(Debug, Clone, PartialEq)]
pub struct NewNotification {
    pub recipient_id: Uuid,
    pub emergency_id: Option<Uuid>,
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
}

/// Query parameters for listing notifications.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListNotificationsQuery {
    #[serde(default)]
    pub unread_only: bool,
    pub limit: Option<i64>,
    pub cursor: Option<String>,
}

/// Response payload for a notification.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationResponse {
    pub notification_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub emergency_id: Option<Uuid>,
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

impl From<Notification> for NotificationResponse {
    fn from(n: Notification) -> Self {
        Self {
            notification_id: n.notification_id,
            emergency_id: n.emergency_id,
            kind: n.kind,
            title: n.title,
            message: n.message,
            is_read: n.is_read,
            created_at: n.created_at,
        }
    }
}

/// Response for listing notifications.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListNotificationsResponse {
    pub notifications: Vec<NotificationResponse>,
    pub unread_count: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_cursor: Option<String>,
}

/// Response for bulk mark-as-read.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkAllReadResponse {
    pub updated: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_roundtrip() {
        for kind in [
            NotificationKind::NearbyEmergency,
            NotificationKind::EmergencyAccepted,
            NotificationKind::FindingReported,
            NotificationKind::EmergencyCompleted,
            NotificationKind::EmergencyResolved,
        ] {
            assert_eq!(NotificationKind::parse(kind.as_str()), Some(kind));
            assert_eq!(
                serde_json::to_string(&kind).unwrap(),
                format!("\"{}\"", kind.as_str())
            );
        }
    }

    #[test]
    fn test_list_query_defaults() {
        let query: ListNotificationsQuery = serde_json::from_str("{}").unwrap();
        assert!(!query.unread_only);
        assert!(query.limit.is_none());
        assert!(query.cursor.is_none());
    }
}
