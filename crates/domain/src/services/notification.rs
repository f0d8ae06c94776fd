//! Push notification service.
//!
//! Stored notifications are always written to the database; push delivery is a
//! best-effort side channel behind [`NotificationService`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{Notification, NotificationKind};

/// Payload delivered to a recipient's devices.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PushPayload {
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub notification_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub emergency_id: Option<Uuid>,
    pub title: String,
    pub body: String,
    pub timestamp: DateTime<Utc>,
}

impl From<&Notification> for PushPayload {
    fn from(n: &Notification) -> Self {
        Self {
            kind: n.kind,
            notification_id: n.notification_id,
            emergency_id: n.emergency_id,
            title: n.title.clone(),
            body: n.message.clone(),
            timestamp: n.created_at,
        }
    }
}

/// Result of a push attempt.
#[derive(Debug, Clone)]
pub enum NotificationResult {
    /// Notification was handed to the push provider.
    Sent,
    /// Sending failed; the stored notification is unaffected.
    Failed(String),
    /// Push is disabled.
    Skipped,
}

/// Push notification delivery.
#[async_trait::async_trait]
pub trait NotificationService: Send + Sync {
    /// Push a notification to all devices of `recipient_id`.
    async fn push(&self, recipient_id: Uuid, payload: &PushPayload) -> NotificationResult;
}

/// Logs pushes instead of delivering them.
#[derive(Debug, Clone, Default)]
pub struct MockNotificationService {
    /// Whether to simulate failures for testing.
    pub simulate_failure: bool,
}

impl MockNotificationService {
    pub fn new() -> Self {
        Self {
            simulate_failure: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            simulate_failure: true,
        }
    }
}

#[async_trait::async_trait]
impl NotificationService for MockNotificationService {
    async fn push(&self, recipient_id: Uuid, payload: &PushPayload) -> NotificationResult {
        if self.simulate_failure {
            tracing::warn!(
                recipient_id = %recipient_id,
                notification_id = %payload.notification_id,
                "Mock notification service simulating failure"
            );
            return NotificationResult::Failed("Simulated failure".to_string());
        }

        tracing::info!(
            recipient_id = %recipient_id,
            notification_id = %payload.notification_id,
            kind = %payload.kind,
            title = %payload.title,
            "Mock: Would push notification"
        );

        NotificationResult::Sent
    }
}

/// Push implementation used when push delivery is switched off.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledNotificationService;

#[async_trait::async_trait]
impl NotificationService for DisabledNotificationService {
    async fn push(&self, _recipient_id: Uuid, _payload: &PushPayload) -> NotificationResult {
        NotificationResult::Skipped
    }
}
