//! Query timing and workflow outcome metrics.

use metrics::{counter, gauge, histogram};
use sqlx::PgPool;
use std::time::Instant;

use crate::error::WorkflowError;

/// Times a repository call. Drop without calling [`QueryTimer::record`] to discard.
pub struct QueryTimer {
    name: &'static str,
    started: Instant,
}

impl QueryTimer {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            started: Instant::now(),
        }
    }

    pub fn record(self) {
        histogram!("skyaid_db_query_seconds", "query" => self.name)
            .record(self.started.elapsed().as_secs_f64());
    }

    /// Records the duration plus an outcome counter for a locking workflow.
    pub fn finish<T>(self, result: &Result<T, WorkflowError>) {
        let outcome = outcome_label(result);
        if let Err(err @ WorkflowError::Database(_)) = result {
            tracing::warn!(workflow = self.name, error = %err, "Workflow failed");
        }
        counter!(
            "skyaid_workflow_outcomes_total",
            "workflow" => self.name,
            "outcome" => outcome
        )
        .increment(1);
        self.record();
    }
}

fn outcome_label<T>(result: &Result<T, WorkflowError>) -> &'static str {
    match result {
        Ok(_) => "ok",
        Err(err) => err.reason(),
    }
}

/// Publishes pool gauges. Called from the periodic pool metrics job.
pub fn record_pool_metrics(pool: &PgPool) {
    let open = pool.size();
    let idle = pool.num_idle() as u32;
    let max = pool.options().get_max_connections();

    gauge!("skyaid_db_connections", "state" => "in_use").set(open.saturating_sub(idle) as f64);
    gauge!("skyaid_db_connections", "state" => "idle").set(idle as f64);
    gauge!("skyaid_db_connections_max").set(max as f64);
}
