//! Notification fan-out for emergency workflow steps.
//!
//! Runs after the primary write has committed. Storage or push failures are
//! logged and never undo or fail the request that triggered them.

use domain::models::{Emergency, NewNotification, Notification, NotificationKind, NotificationResponse};
use domain::services::{
    dispatch_notifications, select_nearby_operators, ChangeEvent, ChangeKind, NotificationResult,
    OperatorCandidate, PushPayload,
};
use persistence::repositories::{NotificationRepository, ProfileRepository};
use tracing::{info, warn};
use uuid::Uuid;

use crate::app::AppState;
use crate::middleware::metrics::{record_notifications_created, record_push_outcome};

/// Notifies operators near a freshly reported emergency. Returns how many were notified.
pub async fn notify_nearby_operators(state: &AppState, emergency: &Emergency) -> usize {
    let profiles = ProfileRepository::new(state.pool.clone());

    let candidates: Vec<OperatorCandidate> =
        match profiles.find_located_operators(emergency.reporter_id).await {
            Ok(rows) => rows.into_iter().map(Into::into).collect(),
            Err(e) => {
                warn!(
                    emergency_id = %emergency.emergency_id,
                    error = %e,
                    "Failed to load operator locations"
                );
                return 0;
            }
        };

    let nearby = select_nearby_operators(
        emergency.location,
        emergency.reporter_id,
        candidates,
        state.config.dispatch.radius_km,
    );

    info!(
        emergency_id = %emergency.emergency_id,
        operators_in_range = nearby.len(),
        radius_km = state.config.dispatch.radius_km,
        "Proximity dispatch"
    );

    deliver(state, dispatch_notifications(emergency, &nearby)).await
}

/// Stores notifications, announces them on the event bus and hands them to
/// the push service. Returns how many were stored.
pub async fn deliver(state: &AppState, notifications: Vec<NewNotification>) -> usize {
    if notifications.is_empty() {
        return 0;
    }

    let repo = NotificationRepository::new(state.pool.clone());
    let stored: Vec<Notification> = match repo.create_many(&notifications).await {
        Ok(entities) => entities.into_iter().map(Into::into).collect(),
        Err(e) => {
            warn!(count = notifications.len(), error = %e, "Failed to store notifications");
            return 0;
        }
    };

    for (kind, count) in count_by_kind(&stored) {
        record_notifications_created(kind.as_str(), count);
    }

    for notification in &stored {
        state.events.publish(notification_event(notification));
    }

    let pushes: Vec<(Uuid, PushPayload)> = stored
        .iter()
        .map(|n| (n.recipient_id, PushPayload::from(n)))
        .collect();
    let notifier = state.notifier.clone();

    tokio::spawn(async move {
        for (recipient_id, payload) in pushes {
            match notifier.push(recipient_id, &payload).await {
                NotificationResult::Sent => record_push_outcome("sent"),
                NotificationResult::Skipped => record_push_outcome("skipped"),
                NotificationResult::Failed(reason) => {
                    warn!(
                        recipient_id = %recipient_id,
                        notification_id = %payload.notification_id,
                        reason = %reason,
                        "Push delivery failed"
                    );
                    record_push_outcome("failed");
                }
            }
        }
    });

    stored.len()
}

/// Change event for a stored notification, visible to its recipient only.
fn notification_event(notification: &Notification) -> ChangeEvent {
    ChangeEvent::new(
        ChangeKind::NotificationCreated,
        notification.emergency_id,
        &NotificationResponse::from(notification.clone()),
    )
    .for_users([notification.recipient_id])
}

fn count_by_kind(notifications: &[Notification]) -> Vec<(NotificationKind, usize)> {
    let mut counts: Vec<(NotificationKind, usize)> = Vec::new();
    for n in notifications {
        match counts.iter_mut().find(|(kind, _)| *kind == n.kind) {
            Some((_, count)) => *count += 1,
            None => counts.push((n.kind, 1)),
        }
    }
    counts
}
