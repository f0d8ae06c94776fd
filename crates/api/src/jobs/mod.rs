//! Background jobs.

mod cleanup_notifications;
mod pool_metrics;
mod scheduler;

pub use cleanup_notifications::CleanupNotificationsJob;
pub use pool_metrics::PoolMetricsJob;
pub use scheduler::{Job, JobFrequency, JobScheduler};
