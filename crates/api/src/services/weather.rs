//! Current weather at an emergency location from an Open-Meteo-compatible API.
//!
//! Operators check wind before launching; the service is optional and the
//! endpoint answers 503 while it is switched off.

use std::time::{Duration, Instant};

use domain::models::GeoPoint;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::ExternalServiceConfig;
use crate::services::circuit_breaker::{CircuitBreaker, CircuitState};

#[derive(Debug, Error)]
pub enum WeatherError {
    #[error("Weather service is disabled")]
    Disabled,

    #[error("Circuit breaker is open, service temporarily unavailable")]
    CircuitOpen,

    #[error("Request timeout after {0}ms")]
    Timeout(u64),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid response from weather service: {0}")]
    InvalidResponse(String),
}

/// Current conditions returned to clients.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentWeather {
    pub location: GeoPoint,
    pub temperature_c: f64,
    pub wind_speed_kmh: f64,
    pub wind_direction_deg: f64,
    pub weather_code: i32,
    pub description: &'static str,
    pub is_day: bool,
    /// Observation time as reported by the provider (local ISO 8601)
    pub observed_at: String,
}

#[derive(Debug, Deserialize)]
struct ForecastResponse {
    current_weather: Option<OpenMeteoCurrent>,
}

#[derive(Debug, Deserialize)]
struct OpenMeteoCurrent {
    temperature: f64,
    windspeed: f64,
    winddirection: f64,
    weathercode: i32,
    #[serde(default)]
    is_day: i32,
    time: String,
}

pub struct WeatherClient {
    client: Client,
    config: ExternalServiceConfig,
    circuit_breaker: CircuitBreaker,
}

impl WeatherClient {
    pub fn new(config: ExternalServiceConfig) -> Result<Self, WeatherError> {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .user_agent(config.user_agent.clone())
            .build()?;

        let circuit_breaker = CircuitBreaker::new(
            "weather",
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

    pub async fn current(&self, point: GeoPoint) -> Result<CurrentWeather, WeatherError> {
        if !self.is_available() {
            return Err(WeatherError::Disabled);
        }
        if !self.circuit_breaker.is_allowed().await {
            return Err(WeatherError::CircuitOpen);
        }

        let start = Instant::now();
        let result = self.call_forecast(point).await;
        let duration_ms = start.elapsed().as_millis() as u64;

        match result {
            Ok(weather) => {
                self.circuit_breaker.record_success().await;
                debug!(duration_ms, "Weather lookup completed");
                Ok(weather)
            }
            Err(e) => {
                self.circuit_breaker.record_failure().await;
                warn!(error = %e, duration_ms, "Weather lookup failed");
                Err(e)
            }
        }
    }

    async fn call_forecast(&self, point: GeoPoint) -> Result<CurrentWeather, WeatherError> {
        let url = format!("{}/v1/forecast", self.config.url.trim_end_matches('/'));

        let response = self
            .client
            .get(&url)
            .query(&[
                ("latitude", point.latitude.to_string()),
                ("longitude", point.longitude.to_string()),
                ("current_weather", "true".to_string()),
            ])
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    WeatherError::Timeout(self.config.timeout_ms)
                } else {
                    WeatherError::Http(e)
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(WeatherError::InvalidResponse(format!("HTTP {}", status)));
        }

        let body: ForecastResponse = response
            .json()
            .await
            .map_err(|e| WeatherError::InvalidResponse(e.to_string()))?;

        into_current(point, body)
    }
}

fn into_current(point: GeoPoint, body: ForecastResponse) -> Result<CurrentWeather, WeatherError> {
    let current = body
        .current_weather
        .ok_or_else(|| WeatherError::InvalidResponse("missing current_weather".into()))?;

    Ok(CurrentWeather {
        location: point,
        temperature_c: current.temperature,
        wind_speed_kmh: current.windspeed,
        wind_direction_deg: current.winddirection,
        weather_code: current.weathercode,
        description: describe_code(current.weathercode),
        is_day: current.is_day != 0,
        observed_at: current.time,
    })
}

/// WMO weather interpretation codes.
fn describe_code(code: i32) -> &'static str {
    match code {
        0 => "Clear sky",
        1..=3 => "Partly cloudy",
        45 | 48 => "Fog",
        51..=57 => "Drizzle",
        61..=67 => "Rain",
        71..=77 => "Snow",
        80..=82 => "Rain showers",
        85 | 86 => "Snow showers",
        95..=99 => "Thunderstorm",
        _ => "Unknown",
    }
}
