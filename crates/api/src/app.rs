use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post, put},
    Router,
};
use domain::services::{
    DisabledNotificationService, EventBus, MockNotificationService, NotificationService,
};
use shared::jwt::{JwtConfig, JwtError};
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::{Config, ExternalServiceConfig};
use crate::middleware::{metrics_handler, metrics_middleware, require_user_auth, trace_id};
use crate::routes::{assignments, emergencies, events, health, notifications, profile};
use crate::services::{GeocodingClient, WeatherClient};

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: Arc<Config>,
    pub jwt: Arc<JwtConfig>,
    pub events: EventBus,
    pub notifier: Arc<dyn NotificationService>,
    /// `None` when geocoding is disabled or the client failed to build.
    pub geocoder: Option<Arc<GeocodingClient>>,
    pub weather: Option<Arc<WeatherClient>>,
}

impl AppState {
    pub fn new(config: Config, pool: PgPool) -> Result<Self, JwtError> {
        let private_key = Some(config.jwt.private_key.as_str()).filter(|k| !k.trim().is_empty());
        let jwt = JwtConfig::from_rsa_pem(
            &config.jwt.public_key,
            private_key,
            config.jwt.token_expiry_secs,
            config.jwt.leeway_secs,
        )?;

        let notifier: Arc<dyn NotificationService> = if config.notifications.push_enabled {
            Arc::new(MockNotificationService::new())
        } else {
            Arc::new(DisabledNotificationService)
        };

        let geocoder = build_client("geocoding", &config.geocoding, GeocodingClient::new);
        let weather = build_client("weather", &config.weather, WeatherClient::new);

        Ok(Self {
            pool,
            events: EventBus::new(config.events.channel_capacity),
            jwt: Arc::new(jwt),
            notifier,
            geocoder,
            weather,
            config: Arc::new(config),
        })
    }

    /// Replaces the push implementation.
    pub fn with_notifier(mut self, notifier: Arc<dyn NotificationService>) -> Self {
        self.notifier = notifier;
        self
    }
}

fn build_client<C, E: std::fmt::Display>(
    name: &'static str,
    config: &ExternalServiceConfig,
    build: impl FnOnce(ExternalServiceConfig) -> Result<C, E>,
) -> Option<Arc<C>> {
    if !config.enabled {
        return None;
    }
    match build(config.clone()) {
        Ok(client) => {
            tracing::info!(service = name, url = %config.url, "External service enabled");
            Some(Arc::new(client))
        }
        Err(e) => {
            tracing::warn!(service = name, error = %e, "Failed to initialize external service client");
            None
        }
    }
}

pub fn create_app(config: Config, pool: PgPool) -> Result<Router, JwtError> {
    Ok(router(AppState::new(config, pool)?))
}

pub fn router(state: AppState) -> Router {
    let config = state.config.clone();

    // Build CORS layer based on configuration
    let cors = if config.security.cors_origins.is_empty() {
        // Default: allow any origin (for development)
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        use tower_http::cors::AllowOrigin;
        let origins: Vec<_> = config
            .security
            .cors_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods(Any)
            .allow_headers(Any)
    };

    let protected_routes = Router::new()
        // Profile
        .route(
            "/api/v1/profile",
            get(profile::get_profile).put(profile::upsert_profile),
        )
        .route("/api/v1/profile/location", put(profile::update_location))
        // Emergencies
        .route(
            "/api/v1/emergencies",
            post(emergencies::create_emergency).get(emergencies::list_emergencies),
        )
        .route(
            "/api/v1/emergencies/:emergency_id",
            get(emergencies::get_emergency),
        )
        .route(
            "/api/v1/emergencies/:emergency_id/accept",
            post(emergencies::accept_emergency),
        )
        .route(
            "/api/v1/emergencies/:emergency_id/complete",
            post(emergencies::complete_emergency),
        )
        .route(
            "/api/v1/emergencies/:emergency_id/resolve",
            post(emergencies::resolve_emergency),
        )
        .route(
            "/api/v1/emergencies/:emergency_id/weather",
            get(emergencies::get_weather),
        )
        .route(
            "/api/v1/emergencies/:emergency_id/findings",
            get(assignments::list_findings),
        )
        // Assignments
        .route("/api/v1/assignments", get(assignments::list_assignments))
        .route(
            "/api/v1/assignments/:assignment_id",
            get(assignments::get_assignment),
        )
        .route(
            "/api/v1/assignments/:assignment_id/location",
            put(assignments::update_drone_location),
        )
        .route(
            "/api/v1/assignments/:assignment_id/complete",
            post(assignments::complete_assignment),
        )
        .route(
            "/api/v1/assignments/:assignment_id/findings",
            post(assignments::create_finding),
        )
        // Notifications
        .route(
            "/api/v1/notifications",
            get(notifications::list_notifications),
        )
        .route(
            "/api/v1/notifications/read-all",
            post(notifications::mark_all_read),
        )
        .route(
            "/api/v1/notifications/:notification_id/read",
            post(notifications::mark_read),
        )
        // Real-time change stream
        .route("/api/v1/events", get(events::stream_events))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_user_auth,
        ));

    // Public routes (no authentication required)
    let public_routes = Router::new()
        .route("/api/health", get(health::health_check))
        .route("/api/health/ready", get(health::ready))
        .route("/api/health/live", get(health::live))
        .route("/metrics", get(metrics_handler));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        // Global middleware (order matters: bottom layers run first)
        .layer(DefaultBodyLimit::max(config.server.max_body_size))
        .layer(CompressionLayer::new())
        .layer(TimeoutLayer::new(Duration::from_secs(
            config.server.request_timeout_secs,
        )))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(trace_id))
        .layer(cors)
        .with_state(state)
}
