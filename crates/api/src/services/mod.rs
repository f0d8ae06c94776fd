//! Application services and outbound integrations.

pub mod circuit_breaker;
pub mod dispatch;
pub mod geocoding;
pub mod weather;

pub use circuit_breaker::{CircuitBreaker, CircuitState};
pub use geocoding::{GeocodingClient, GeocodingError};
pub use weather::{CurrentWeather, WeatherClient, WeatherError};
