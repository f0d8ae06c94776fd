//! Reverse geocoding against a Nominatim-compatible service.
//!
//! Used to fill in an address when a reporter submits only coordinates.

use std::time::{Duration, Instant};

use domain::models::GeoPoint;
use reqwest::Client;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::ExternalServiceConfig;
use crate::services::circuit_breaker::{CircuitBreaker, CircuitState};

/// Errors from the geocoding client.
#[derive(Debug, Error)]
pub enum GeocodingError {
    #[error("Geocoding service is disabled")]
    Disabled,

    #[error("Circuit breaker is open, service temporarily unavailable")]
    CircuitOpen,

    #[error("Request timeout after {0}ms")]
    Timeout(u64),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Geocoding service error: {0}")]
    ServiceError(String),
}

#[derive(Debug, Deserialize)]
struct NominatimReverse {
    display_name: Option<String>,
    error: Option<String>,
}

/// Client for reverse geocoding.
pub struct GeocodingClient {
    client: Client,
    config: ExternalServiceConfig,
    circuit_breaker: CircuitBreaker,
}

impl GeocodingClient {
    pub fn new(config: ExternalServiceConfig) -> Result<Self, GeocodingError> {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .user_agent(config.user_agent.clone())
            .build()?;

        let circuit_breaker = CircuitBreaker::new(
            "geocoding",
            config.circuit_breaker_failures,
            config.circuit_breaker_reset_secs,
        );

        Ok(Self {
            client,
            config,
            circuit_breaker,
        })
    }

    pub fn is_available(&self) -> bool {
        self.config.enabled && !self.config.url.is_empty()
    }

    pub async fn circuit_state(&self) -> CircuitState {
        self.circuit_breaker.state().await
    }

    /// Human-readable address for a coordinate, if the service knows one.
    pub async fn reverse(&self, point: GeoPoint) -> Result<Option<String>, GeocodingError> {
        if !self.is_available() {
            return Err(GeocodingError::Disabled);
        }
        if !self.circuit_breaker.is_allowed().await {
            return Err(GeocodingError::CircuitOpen);
        }

        let start = Instant::now();
        let result = self.call_reverse(point).await;
        let duration_ms = start.elapsed().as_millis() as u64;

        match result {
            Ok(address) => {
                self.circuit_breaker.record_success().await;
                debug!(duration_ms, found = address.is_some(), "Reverse geocoding completed");
                Ok(address)
            }
            Err(e) => {
                self.circuit_breaker.record_failure().await;
                warn!(error = %e, duration_ms, "Reverse geocoding failed");
                Err(e)
            }
        }
    }

    async fn call_reverse(&self, point: GeoPoint) -> Result<Option<String>, GeocodingError> {
        let url = format!("{}/reverse", self.config.url.trim_end_matches('/'));

        let response = self
            .client
            .get(&url)
            .query(&[
                ("format", "jsonv2".to_string()),
                ("lat", point.latitude.to_string()),
                ("lon", point.longitude.to_string()),
            ])
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    GeocodingError::Timeout(self.config.timeout_ms)
                } else {
                    GeocodingError::Http(e)
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(GeocodingError::ServiceError(format!("HTTP {}", status)));
        }

        let body: NominatimReverse = response
            .json()
            .await
            .map_err(|e| GeocodingError::ServiceError(e.to_string()))?;

        Ok(parse_reverse(body))
    }
}

/// Nominatim answers unknown locations with `{"error": "Unable to geocode"}`.
fn parse_reverse(body: NominatimReverse) -> Option<String> {
    if let Some(error) = body.error {
        debug!(error = %error, "No address for location");
        return None;
    }
    body.display_name
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(enabled: bool) -> ExternalServiceConfig {
        ExternalServiceConfig {
            enabled,
            url: "http://127.0.0.1:9".to_string(),
            ..ExternalServiceConfig::default()
        }
    }

    #[tokio::test]
    async fn test_disabled_client() {
        let client = GeocodingClient::new(config(false)).unwrap();
        assert!(!client.is_available());
        let result = client.reverse(GeoPoint::new(47.0, 8.0)).await;
        assert!(matches!(result, Err(GeocodingError::Disabled)));
    }

    #[test]
    fn test_parse_display_name() {
        let body: NominatimReverse =
            serde_json::from_str(r#"{"display_name": " Bahnhofstrasse 1, Zürich ", "lat": "47.3"}"#)
                .unwrap();
        assert_eq!(
            parse_reverse(body).as_deref(),
            Some("Bahnhofstrasse 1, Zürich")
        );
    }

    #[test]
    fn test_parse_error_response() {
        let body: NominatimReverse =
            serde_json::from_str(r#"{"error": "Unable to geocode"}"#).unwrap();
        assert_eq!(parse_reverse(body), None);
    }

    #[tokio::test]
    async fn test_unreachable_service_counts_failures() {
        let mut cfg = config(true);
        cfg.circuit_breaker_failures = 1;
        cfg.timeout_ms = 200;
        let client = GeocodingClient::new(cfg).unwrap();

        assert!(client.reverse(GeoPoint::new(47.0, 8.0)).await.is_err());
        assert_eq!(client.circuit_state().await, CircuitState::Open);
        assert!(matches!(
            client.reverse(GeoPoint::new(47.0, 8.0)).await,
            Err(GeocodingError::CircuitOpen)
        ));
    }
}
