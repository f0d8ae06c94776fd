//! Database entity definitions.
//!
//! Entities are direct mappings to database rows.

pub mod assignment;
pub mod emergency;
pub mod finding;
pub mod notification;
pub mod profile;

pub use assignment::AssignmentEntity;
pub use emergency::EmergencyEntity;
pub use finding::FindingEntity;
pub use notification::NotificationEntity;
pub use profile::{OperatorLocationEntity, ProfileEntity};
