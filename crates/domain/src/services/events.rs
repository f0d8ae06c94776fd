//! Real-time change events.
//!
//! Every write to an emergency, assignment, finding or notification publishes a
//! [`ChangeEvent`] on the [`EventBus`]. Subscribers (the SSE endpoint) filter
//! events down to what the connected user is allowed to see.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::{broadcast, watch};
use uuid::Uuid;

/// Default number of events buffered per subscriber.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1024;

/// What changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    EmergencyCreated,
    EmergencyUpdated,
    AssignmentCreated,
    AssignmentUpdated,
    DroneMoved,
    FindingCreated,
    NotificationCreated,
}

impl ChangeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeKind::EmergencyCreated => "emergency_created",
            ChangeKind::EmergencyUpdated => "emergency_updated",
            ChangeKind::AssignmentCreated => "assignment_created",
            ChangeKind::AssignmentUpdated => "assignment_updated",
            ChangeKind::DroneMoved => "drone_moved",
            ChangeKind::FindingCreated => "finding_created",
            ChangeKind::NotificationCreated => "notification_created",
        }
    }
}

/// A single record-level change.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeEvent {
    pub kind: ChangeKind,
    pub emergency_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assignment_id: Option<Uuid>,
    /// Serialized API representation of the changed record
    pub payload: serde_json::Value,
    pub occurred_at: DateTime<Utc>,
    /// Users who may see this event
    #[serde(skip)]
    pub audience: Vec<Uuid>,
    /// Whether every operator may see this event
    #[serde(skip)]
    pub visible_to_operators: bool,
}

impl ChangeEvent {
    pub fn new<T: Serialize>(kind: ChangeKind, emergency_id: Option<Uuid>, record: &T) -> Self {
        Self {
            kind,
            emergency_id,
            assignment_id: None,
            payload: serde_json::to_value(record).unwrap_or(serde_json::Value::Null),
            occurred_at: Utc::now(),
            audience: Vec::new(),
            visible_to_operators: false,
        }
    }

    pub fn with_assignment(mut self, assignment_id: Uuid) -> Self {
        self.assignment_id = Some(assignment_id);
        self
    }

    /// Adds users to the audience, skipping duplicates.
    pub fn for_users<I: IntoIterator<Item = Uuid>>(mut self, users: I) -> Self {
        for user in users {
            if !self.audience.contains(&user) {
                self.audience.push(user);
            }
        }
        self
    }

    pub fn for_operators(mut self) -> Self {
        self.visible_to_operators = true;
        self
    }

    pub fn is_visible_to(&self, user_id: Uuid, is_operator: bool) -> bool {
        (is_operator && self.visible_to_operators) || self.audience.contains(&user_id)
    }
}

/// In-process fan-out of change events.
///
/// Every clone shares one sender, so subscribers never see the channel close
/// while the application state is alive. [`EventBus::close`] tells them to stop.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<ChangeEvent>,
    closed: Arc<watch::Sender<bool>>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        let (closed, _) = watch::channel(false);
        Self {
            sender,
            closed: Arc::new(closed),
        }
    }

    /// Signals every open subscription to finish. Used on shutdown.
    pub fn close(&self) {
        self.closed.send_replace(true);
    }

    pub fn is_closed(&self) -> bool {
        *self.closed.borrow()
    }

    /// Receiver that flips to `true` once [`EventBus::close`] is called.
    pub fn closed(&self) -> watch::Receiver<bool> {
        self.closed.subscribe()
    }

    /// Publishes an event; returns how many subscribers received it.
    pub fn publish(&self, event: ChangeEvent) -> usize {
        let kind = event.kind;
        match self.sender.send(event) {
            Ok(receivers) => receivers,
            Err(_) => {
                tracing::trace!(kind = kind.as_str(), "No subscribers for change event");
                0
            }
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CHANNEL_CAPACITY)
    }
}
