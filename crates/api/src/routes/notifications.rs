//! Notification inbox endpoint handlers.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use domain::models::notification::{
    ListNotificationsQuery, ListNotificationsResponse, MarkAllReadResponse, NotificationResponse,
};
use domain::models::Notification;
use persistence::repositories::NotificationRepository;
use shared::pagination::{clamp_page_size, decode_cursor, encode_cursor};
use uuid::Uuid;

use crate::app::AppState;
use crate::error::ApiError;
use crate::middleware::UserAuth;

/// List the caller's notifications, newest first.
///
/// GET /api/v1/notifications?unreadOnly=<bool>&limit=<n>&cursor=<cursor>
pub async fn list_notifications(
    State(state): State<AppState>,
    auth: UserAuth,
    Query(query): Query<ListNotificationsQuery>,
) -> Result<Json<ListNotificationsResponse>, ApiError> {
    let before = query
        .cursor
        .as_deref()
        .map(decode_cursor)
        .transpose()
        .map_err(|e| ApiError::Validation(e.to_string()))?;
    let limit = clamp_page_size(query.limit);

    let repo = NotificationRepository::new(state.pool.clone());
    // One extra row tells us whether another page exists
    let mut rows = repo
        .list(auth.user_id, query.unread_only, before, limit + 1)
        .await?;

    let has_more = rows.len() as i64 > limit;
    rows.truncate(limit as usize);
    let next_cursor = if has_more {
        rows.last().map(|n| encode_cursor(n.created_at, n.id))
    } else {
        None
    };

    let unread_count = repo.count_unread(auth.user_id).await?;
    let notifications = rows
        .into_iter()
        .map(|e| {
            let notification: Notification = e.into();
            notification.into()
        })
        .collect();

    Ok(Json(ListNotificationsResponse {
        notifications,
        unread_count,
        next_cursor,
    }))
}

/// Mark one of the caller's notifications as read.
///
/// POST /api/v1/notifications/:notification_id/read
pub async fn mark_read(
    State(state): State<AppState>,
    auth: UserAuth,
    Path(notification_id): Path<Uuid>,
) -> Result<Json<NotificationResponse>, ApiError> {
    let notification: Notification = NotificationRepository::new(state.pool.clone())
        .mark_read(notification_id, auth.user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Notification not found".to_string()))?
        .into();

    Ok(Json(notification.into()))
}

/// Mark all of the caller's notifications as read.
///
/// POST /api/v1/notifications/read-all
pub async fn mark_all_read(
    State(state): State<AppState>,
    auth: UserAuth,
) -> Result<Json<MarkAllReadResponse>, ApiError> {
    let updated = NotificationRepository::new(state.pool.clone())
        .mark_all_read(auth.user_id)
        .await?;

    Ok(Json(MarkAllReadResponse { updated }))
}
