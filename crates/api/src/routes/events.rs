//! Server-Sent Events stream of record changes.
//!
//! Browsers cannot set headers on `EventSource`, so the token may also be
//! passed as `?access_token=`.

use std::convert::Infallible;
use std::time::Duration;

use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
};
use domain::services::ChangeEvent;
use futures::stream::{self, Stream};
use persistence::repositories::ProfileRepository;
use tokio::sync::{
    broadcast::{error::RecvError, Receiver},
    watch,
};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::app::AppState;
use crate::error::ApiError;
use crate::middleware::metrics::record_event_subscribers;
use crate::middleware::UserAuth;

/// Keeps the subscriber gauge in step with open streams.
struct SubscriberGuard {
    user_id: Uuid,
}

impl SubscriberGuard {
    fn new(user_id: Uuid) -> Self {
        record_event_subscribers(1.0);
        Self { user_id }
    }
}

impl Drop for SubscriberGuard {
    fn drop(&mut self) {
        record_event_subscribers(-1.0);
        debug!(user_id = %self.user_id, "Event stream closed");
    }
}

struct Subscription {
    rx: Receiver<ChangeEvent>,
    closed: watch::Receiver<bool>,
    user_id: Uuid,
    is_operator: bool,
    _guard: SubscriberGuard,
}

/// Stream change events visible to the caller.
///
/// GET /api/v1/events
pub async fn stream_events(
    State(state): State<AppState>,
    auth: UserAuth,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    let is_operator = ProfileRepository::new(state.pool.clone())
        .find_by_user_id(auth.user_id)
        .await?
        .is_some_and(|p| p.is_operator);

    info!(user_id = %auth.user_id, is_operator, "Event stream opened");

    let subscription = Subscription {
        rx: state.events.subscribe(),
        closed: state.events.closed(),
        user_id: auth.user_id,
        is_operator,
        _guard: SubscriberGuard::new(auth.user_id),
    };

    let events = stream::unfold(subscription, |mut sub| async move {
        next_visible(&mut sub)
            .await
            .map(|event| (Ok::<_, Infallible>(event), sub))
    });

    let keep_alive = KeepAlive::new().interval(Duration::from_secs(
        state.config.events.keep_alive_secs.max(1),
    ));

    Ok(Sse::new(events).keep_alive(keep_alive))
}

/// Waits for the next event the subscriber may see.
///
/// `None` once the bus is closed for shutdown or dropped, which ends the
/// response so graceful shutdown can drain the connection.
async fn next_visible(sub: &mut Subscription) -> Option<Event> {
    loop {
        if *sub.closed.borrow_and_update() {
            return None;
        }

        let received = tokio::select! {
            received = sub.rx.recv() => received,
            changed = sub.closed.changed() => {
                if changed.is_err() {
                    return None;
                }
                continue;
            }
        };

        match received {
            Ok(change) => {
                if !change.is_visible_to(sub.user_id, sub.is_operator) {
                    continue;
                }
                match to_sse(&change) {
                    Ok(event) => return Some(event),
                    Err(e) => {
                        warn!(kind = change.kind.as_str(), error = %e, "Failed to encode change event");
                    }
                }
            }
            Err(RecvError::Lagged(skipped)) => {
                warn!(user_id = %sub.user_id, skipped, "Event subscriber lagged, events dropped");
            }
            Err(RecvError::Closed) => return None,
        }
    }
}

fn to_sse(change: &ChangeEvent) -> Result<Event, axum::Error> {
    Event::default().event(change.kind.as_str()).json_data(change)
}
