use std::time::Duration;

use anyhow::{Context, Result};
use tracing::info;

use skyaid_api::app;
use skyaid_api::config::Config;
use skyaid_api::jobs::{CleanupNotificationsJob, JobScheduler, PoolMetricsJob};
use skyaid_api::middleware::{init_metrics, logging::init_logging};

const JOB_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(10);

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let config = Config::load().context("Failed to load configuration")?;

    init_logging(&config.logging).context("Failed to initialize logging")?;
    init_metrics().context("Failed to install Prometheus recorder")?;

    info!("Starting SkyAid API v{}", env!("CARGO_PKG_VERSION"));

    let db_config: persistence::db::DatabaseConfig = (&config.database).into();
    let pool = persistence::db::create_pool(&db_config).await?;

    info!("Running database migrations...");
    sqlx::migrate!("../persistence/src/migrations")
        .run(&pool)
        .await?;
    info!("Migrations completed");

    let mut scheduler = JobScheduler::new();
    scheduler.register(PoolMetricsJob::new(pool.clone()));
    scheduler.register(CleanupNotificationsJob::new(
        pool.clone(),
        config.notifications.retention_days,
    ));
    scheduler.start();

    let addr = config.socket_addr().context("Invalid server address")?;
    let state = app::AppState::new(config, pool).context("Failed to build application")?;
    let events = state.events.clone();
    let app = app::router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            // Open event streams hold their connections until the bus closes.
            events.close();
        })
        .await?;

    scheduler.shutdown();
    scheduler.wait_for_shutdown(JOB_SHUTDOWN_TIMEOUT).await;
    info!("Server stopped");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
