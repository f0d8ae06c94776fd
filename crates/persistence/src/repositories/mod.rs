//! Repository implementations for database operations.

pub mod assignment;
pub mod emergency;
pub mod finding;
pub mod notification;
pub mod profile;

pub use assignment::AssignmentRepository;
pub use emergency::{AcceptOutcome, CompleteOutcome, EmergencyRepository, ResolveOutcome};
pub use finding::FindingRepository;
pub use notification::NotificationRepository;
pub use profile::ProfileRepository;
