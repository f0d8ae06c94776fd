//! Circuit breaker shared by the outbound HTTP clients.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::time::{Duration, Instant};

use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// Circuit breaker states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

impl CircuitState {
    pub fn as_str(&self) -> &'static str {
        match self {
            CircuitState::Closed => "closed",
            CircuitState::Open => "open",
            CircuitState::HalfOpen => "half_open",
        }
    }
}

/// Opens after `failure_threshold` consecutive failures and lets a probe
/// request through once `reset_timeout` has elapsed.
pub struct CircuitBreaker {
    name: &'static str,
    is_open: AtomicBool,
    failure_count: AtomicU32,
    failure_threshold: u32,
    reset_timeout: Duration,
    opened_at: RwLock<Option<Instant>>,
}

impl CircuitBreaker {
    pub fn new(name: &'static str, failure_threshold: u32, reset_timeout_secs: u64) -> Self {
        Self {
            name,
            is_open: AtomicBool::new(false),
            failure_count: AtomicU32::new(0),
            failure_threshold: failure_threshold.max(1),
            reset_timeout: Duration::from_secs(reset_timeout_secs),
            opened_at: RwLock::new(None),
        }
    }

    /// Whether a request may be sent now.
    pub async fn is_allowed(&self) -> bool {
        if !self.is_open.load(Ordering::Relaxed) {
            return true;
        }

        let opened_at = *self.opened_at.read().await;
        match opened_at {
            Some(opened) if opened.elapsed() >= self.reset_timeout => {
                debug!(service = self.name, "Circuit breaker half-open, allowing probe");
                true
            }
            _ => false,
        }
    }

    pub async fn record_success(&self) {
        self.failure_count.store(0, Ordering::Relaxed);
        if self.is_open.swap(false, Ordering::Relaxed) {
            info!(service = self.name, "Circuit breaker closed after successful request");
            *self.opened_at.write().await = None;
        }
    }

    pub async fn record_failure(&self) {
        let count = self.failure_count.fetch_add(1, Ordering::Relaxed) + 1;

        if count >= self.failure_threshold {
            let was_open = self.is_open.swap(true, Ordering::Relaxed);
            if !was_open {
                warn!(
                    service = self.name,
                    failure_count = count,
                    threshold = self.failure_threshold,
                    "Circuit breaker opened due to consecutive failures"
                );
            }
            // A failed half-open probe restarts the reset window
            *self.opened_at.write().await = Some(Instant::now());
        }
    }

    pub async fn state(&self) -> CircuitState {
        if !self.is_open.load(Ordering::Relaxed) {
            return CircuitState::Closed;
        }

        match *self.opened_at.read().await {
            Some(opened) if opened.elapsed() >= self.reset_timeout => CircuitState::HalfOpen,
            _ => CircuitState::Open,
        }
    }
}
