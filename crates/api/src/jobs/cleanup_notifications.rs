//! Purges read notifications past their retention period.

use persistence::repositories::NotificationRepository;
use sqlx::PgPool;
use tracing::info;

use super::scheduler::{Job, JobFrequency};

const BATCH_SIZE: i64 = 5_000;

pub struct CleanupNotificationsJob {
    repo: NotificationRepository,
    retention_days: u32,
}

impl CleanupNotificationsJob {
    pub fn new(pool: PgPool, retention_days: u32) -> Self {
        Self {
            repo: NotificationRepository::new(pool),
            retention_days,
        }
    }

    /// Deletes in batches so no single statement holds locks for long.
    async fn purge(&self) -> Result<u64, sqlx::Error> {
        let mut total_deleted: u64 = 0;

        loop {
            let deleted = self
                .repo
                .delete_read_older_than(self.retention_days, BATCH_SIZE)
                .await?;
            total_deleted += deleted;

            if deleted < BATCH_SIZE as u64 {
                break;
            }
            tokio::task::yield_now().await;
        }

        Ok(total_deleted)
    }
}

#[async_trait::async_trait]
impl Job for CleanupNotificationsJob {
    fn name(&self) -> &'static str {
        "cleanup_notifications"
    }

    fn frequency(&self) -> JobFrequency {
        JobFrequency::Hourly
    }

    async fn execute(&self) -> Result<(), String> {
        let deleted = self
            .purge()
            .await
            .map_err(|e| format!("Failed to purge read notifications: {}", e))?;

        if deleted > 0 {
            info!(
                deleted,
                retention_days = self.retention_days,
                "Purged read notifications"
            );
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_job_metadata() {
        let pool = PgPool::connect_lazy("postgres://localhost/skyaid_unused").unwrap();
        let job = CleanupNotificationsJob::new(pool, 30);
        assert_eq!(job.name(), "cleanup_notifications");
        assert!(matches!(job.frequency(), JobFrequency::Hourly));
        assert_eq!(job.retention_days, 30);
    }
}
