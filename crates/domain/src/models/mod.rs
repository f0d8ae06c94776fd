//! Domain models for SkyAid.

pub mod assignment;
pub mod emergency;
pub mod finding;
pub mod location;
pub mod notification;
pub mod profile;

pub use assignment::{AssignmentStatus, SearchArea, SearchAssignment};
pub use emergency::{Emergency, EmergencyAction, EmergencyStatus, EmergencyType, TransitionError};
pub use finding::Finding;
pub use location::GeoPoint;
pub use notification::{
    NewNotification, Notification, NotificationKind, NotificationResponse,
};
pub use profile::UserProfile;
