//! Domain services for SkyAid.
//!
//! Services contain business logic that operates on domain models.

pub mod dispatch;
pub mod events;
pub mod geo;
pub mod notification;
pub mod search_area;

pub use dispatch::{
    accepted_notification, completed_notification, dispatch_notifications, finding_notification,
    resolved_notifications, select_nearby_operators, NearbyOperator, OperatorCandidate,
    DEFAULT_DISPATCH_RADIUS_KM,
};
pub use events::{ChangeEvent, ChangeKind, EventBus};
pub use geo::{haversine_km, within_radius, MIN_DISTANCE_KM};
pub use notification::{
    DisabledNotificationService, MockNotificationService, NotificationResult, NotificationService,
    PushPayload,
};
pub use search_area::{SearchArea, DEFAULT_HALF_WIDTH_M};
