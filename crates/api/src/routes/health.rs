//! Health check endpoint handlers.

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;

use crate::app::AppState;
use crate::config::ExternalServiceConfig;
use crate::services::CircuitState;

/// Health check response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub database: DatabaseHealth,
    pub external_services: ExternalServicesHealth,
    pub event_subscribers: usize,
}

/// Database health status.
#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct DatabaseHealth {
    pub connected: bool,
    pub latency_ms: Option<u64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct ExternalServicesHealth {
    pub geocoding: ServiceHealth,
    pub weather: ServiceHealth,
}

/// Outbound service status.
#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct ServiceHealth {
    pub enabled: bool,
    /// Whether requests are currently let through (circuit not open).
    pub available: bool,
    pub circuit_state: String,
}

impl ServiceHealth {
    fn new(config: &ExternalServiceConfig, circuit: Option<CircuitState>) -> Self {
        match circuit {
            Some(state) => Self {
                enabled: true,
                available: state != CircuitState::Open,
                circuit_state: state.as_str().to_string(),
            },
            None if !config.enabled => Self {
                enabled: false,
                available: false,
                circuit_state: "disabled".to_string(),
            },
            None => Self {
                enabled: true,
                available: false,
                circuit_state: "initialization_failed".to_string(),
            },
        }
    }
}

/// Simple status response for liveness/readiness probes.
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: String,
}

/// Full health check endpoint.
///
/// GET /api/health
pub async fn health_check(
    State(state): State<AppState>,
) -> (StatusCode, Json<HealthResponse>) {
    let start = std::time::Instant::now();
    let db_connected = sqlx::query("SELECT 1").execute(&state.pool).await.is_ok();
    let latency_ms = start.elapsed().as_millis() as u64;

    let geocoding_circuit = match &state.geocoder {
        Some(client) => Some(client.circuit_state().await),
        None => None,
    };
    let weather_circuit = match &state.weather {
        Some(client) => Some(client.circuit_state().await),
        None => None,
    };

    let response = HealthResponse {
        status: if db_connected { "healthy" } else { "unhealthy" }.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        database: DatabaseHealth {
            connected: db_connected,
            latency_ms: db_connected.then_some(latency_ms),
        },
        external_services: ExternalServicesHealth {
            geocoding: ServiceHealth::new(&state.config.geocoding, geocoding_circuit),
            weather: ServiceHealth::new(&state.config.weather, weather_circuit),
        },
        event_subscribers: state.events.subscriber_count(),
    };

    let status = if db_connected {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(response))
}

/// Liveness probe endpoint.
///
/// Returns 200 OK if the process is running.
pub async fn live() -> Json<StatusResponse> {
    Json(StatusResponse {
        status: "alive".to_string(),
    })
}

/// Readiness probe endpoint.
///
/// Returns 200 OK if the service can accept traffic (database connected).
pub async fn ready(State(state): State<AppState>) -> Result<Json<StatusResponse>, StatusCode> {
    let db_connected = sqlx::query("SELECT 1").execute(&state.pool).await.is_ok();

    if db_connected {
        Ok(Json(StatusResponse {
            status: "ready".to_string(),
        }))
    } else {
        Err(StatusCode::SERVICE_UNAVAILABLE)
    }
}
