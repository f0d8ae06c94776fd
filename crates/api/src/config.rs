use serde::Deserialize;
use std::net::SocketAddr;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub logging: LoggingConfig,
    pub security: SecurityConfig,
    /// Bearer token verification
    pub jwt: JwtAuthConfig,
    #[serde(default)]
    pub dispatch: DispatchConfig,
    #[serde(default)]
    pub notifications: NotificationsConfig,
    #[serde(default)]
    pub geocoding: ExternalServiceConfig,
    #[serde(default)]
    pub weather: ExternalServiceConfig,
    #[serde(default)]
    pub events: EventsConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Findings carry base64 images, so this must exceed the encoded 5 MiB limit.
    #[serde(default = "default_max_body_size")]
    pub max_body_size: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    #[serde(default = "default_min_connections")]
    pub min_connections: u32,

    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_secs: u64,
}

impl From<&DatabaseConfig> for persistence::db::DatabaseConfig {
    fn from(config: &DatabaseConfig) -> Self {
        Self {
            url: config.url.clone(),
            max_connections: config.max_connections,
            min_connections: config.min_connections,
            connect_timeout_secs: config.connect_timeout_secs,
            idle_timeout_secs: config.idle_timeout_secs,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default = "default_log_format")]
    pub format: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SecurityConfig {
    #[serde(default)]
    pub cors_origins: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JwtAuthConfig {
    /// Auth provider's RSA public key in PEM format
    pub public_key: String,

    /// RSA private key in PEM format; only set where tokens are minted locally
    #[serde(default)]
    pub private_key: String,

    /// Lifetime of locally minted tokens
    #[serde(default = "default_token_expiry")]
    pub token_expiry_secs: i64,

    /// Leeway in seconds for clock skew tolerance
    #[serde(default = "default_jwt_leeway")]
    pub leeway_secs: u64,
}

/// Proximity notifier and search-area settings.
#[derive(Debug, Clone, Deserialize)]
pub struct DispatchConfig {
    #[serde(default = "default_radius_km")]
    pub radius_km: f64,

    #[serde(default = "default_search_half_width_m")]
    pub search_half_width_m: f64,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            radius_km: default_radius_km(),
            search_half_width_m: default_search_half_width_m(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NotificationsConfig {
    /// Read notifications older than this are purged
    #[serde(default = "default_notification_retention_days")]
    pub retention_days: u32,

    /// Whether to hand notifications to the push service
    #[serde(default)]
    pub push_enabled: bool,
}

impl Default for NotificationsConfig {
    fn default() -> Self {
        Self {
            retention_days: default_notification_retention_days(),
            push_enabled: false,
        }
    }
}

/// Settings shared by the outbound HTTP collaborators (geocoding, weather).
#[derive(Debug, Clone, Deserialize)]
pub struct ExternalServiceConfig {
    #[serde(default)]
    pub enabled: bool,

    /// Base URL of the service
    #[serde(default)]
    pub url: String,

    #[serde(default = "default_external_timeout_ms")]
    pub timeout_ms: u64,

    /// Sent as User-Agent; public Nominatim instances require one
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Number of failures before circuit breaker opens
    #[serde(default = "default_circuit_breaker_failures")]
    pub circuit_breaker_failures: u32,

    /// Seconds to keep circuit breaker open before retry
    #[serde(default = "default_circuit_breaker_reset_secs")]
    pub circuit_breaker_reset_secs: u64,
}

impl Default for ExternalServiceConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            url: String::new(),
            timeout_ms: default_external_timeout_ms(),
            user_agent: default_user_agent(),
            circuit_breaker_failures: default_circuit_breaker_failures(),
            circuit_breaker_reset_secs: default_circuit_breaker_reset_secs(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct EventsConfig {
    /// Events buffered per SSE subscriber before it starts skipping
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,

    #[serde(default = "default_keep_alive_secs")]
    pub keep_alive_secs: u64,
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self {
            channel_capacity: default_channel_capacity(),
            keep_alive_secs: default_keep_alive_secs(),
        }
    }
}

// Default value functions
fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    8080
}
fn default_request_timeout() -> u64 {
    30
}
fn default_max_body_size() -> usize {
    8 * 1024 * 1024
}
fn default_max_connections() -> u32 {
    20
}
fn default_min_connections() -> u32 {
    5
}
fn default_connect_timeout() -> u64 {
    10
}
fn default_idle_timeout() -> u64 {
    600
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_log_format() -> String {
    "json".to_string()
}
fn default_token_expiry() -> i64 {
    3600
}
fn default_jwt_leeway() -> u64 {
    shared::jwt::DEFAULT_LEEWAY_SECS
}
fn default_radius_km() -> f64 {
    domain::services::DEFAULT_DISPATCH_RADIUS_KM
}
fn default_search_half_width_m() -> f64 {
    domain::services::DEFAULT_HALF_WIDTH_M
}
fn default_notification_retention_days() -> u32 {
    30
}
fn default_external_timeout_ms() -> u64 {
    5000
}
fn default_user_agent() -> String {
    concat!("skyaid/", env!("CARGO_PKG_VERSION")).to_string()
}
fn default_circuit_breaker_failures() -> u32 {
    5
}
fn default_circuit_breaker_reset_secs() -> u64 {
    60
}
fn default_channel_capacity() -> usize {
    domain::services::events::DEFAULT_CHANNEL_CAPACITY
}
fn default_keep_alive_secs() -> u64 {
    15
}

/// Configuration validation error
#[derive(Debug, thiserror::Error)]
pub enum ConfigValidationError {
    #[error("Missing required configuration: {0}")]
    MissingRequired(String),

    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}

impl Config {
    /// Load configuration from files and environment variables.
    ///
    /// Loading order (later sources override earlier):
    /// 1. config/default.toml - base configuration with defaults
    /// 2. config/local.toml - local overrides (optional, not in git)
    /// 3. Environment variables with SKYAID__ prefix
    pub fn load() -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default"))
            .add_source(config::File::with_name("config/local").required(false))
            .add_source(
                config::Environment::with_prefix("SKYAID")
                    .prefix_separator("__")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("security.cors_origins")
                    .try_parsing(true),
            )
            .build()?;

        let cfg: Self = config.try_deserialize()?;
        cfg.validate()
            .map_err(|e| config::ConfigError::Message(e.to_string()))?;
        Ok(cfg)
    }

    /// Load configuration for testing with custom overrides.
    ///
    /// Defaults are embedded so tests do not depend on the working directory.
    #[cfg(test)]
    pub fn load_for_test(overrides: &[(&str, &str)]) -> Result<Self, config::ConfigError> {
        let defaults = r#"
            [server]
            host = "0.0.0.0"
            port = 8080
            request_timeout_secs = 30
            max_body_size = 8388608

            [database]
            url = ""
            max_connections = 20
            min_connections = 5
            connect_timeout_secs = 10
            idle_timeout_secs = 600

            [logging]
            level = "info"
            format = "json"

            [security]
            cors_origins = []

            [jwt]
            public_key = "test-public-key"
            private_key = ""
            token_expiry_secs = 3600
            leeway_secs = 30

            [dispatch]
            radius_km = 3.0
            search_half_width_m = 300.0

            [notifications]
            retention_days = 30
            push_enabled = false

            [geocoding]
            enabled = false
            url = ""

            [weather]
            enabled = false
            url = ""

            [events]
            channel_capacity = 1024
            keep_alive_secs = 15
        "#;

        let mut builder = config::Config::builder()
            .add_source(config::File::from_str(defaults, config::FileFormat::Toml));

        for (key, value) in overrides {
            builder = builder.set_override(*key, *value)?;
        }

        let cfg: Self = builder.build()?.try_deserialize()?;
        // Skip validation in tests to allow partial configs
        Ok(cfg)
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if self.database.url.is_empty() {
            return Err(ConfigValidationError::MissingRequired(
                "SKYAID__DATABASE__URL environment variable must be set".to_string(),
            ));
        }

        if self.server.port == 0 {
            return Err(ConfigValidationError::InvalidValue(
                "Server port cannot be 0".to_string(),
            ));
        }

        if self.database.min_connections > self.database.max_connections {
            return Err(ConfigValidationError::InvalidValue(
                "min_connections cannot exceed max_connections".to_string(),
            ));
        }

        if self.jwt.public_key.trim().is_empty() {
            return Err(ConfigValidationError::MissingRequired(
                "SKYAID__JWT__PUBLIC_KEY must be set".to_string(),
            ));
        }

        if !(self.dispatch.radius_km.is_finite() && self.dispatch.radius_km > 0.0) {
            return Err(ConfigValidationError::InvalidValue(
                "dispatch.radius_km must be positive".to_string(),
            ));
        }

        if !(self.dispatch.search_half_width_m.is_finite()
            && self.dispatch.search_half_width_m > 0.0)
        {
            return Err(ConfigValidationError::InvalidValue(
                "dispatch.search_half_width_m must be positive".to_string(),
            ));
        }

        for (name, service) in [("geocoding", &self.geocoding), ("weather", &self.weather)] {
            if service.enabled && service.url.is_empty() {
                return Err(ConfigValidationError::MissingRequired(format!(
                    "{}.url must be set when {} is enabled",
                    name, name
                )));
            }
        }

        Ok(())
    }

    pub fn socket_addr(&self) -> Result<SocketAddr, std::net::AddrParseError> {
        format!("{}:{}", self.server.host, self.server.port).parse()
    }
}
