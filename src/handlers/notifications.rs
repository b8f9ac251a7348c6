use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::response::sse::{Event, Sse};
use axum::Json;
use serde::Deserialize;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt;

use crate::db::queries;
use crate::errors::{AppError, AppResult};
use crate::models::Notification;
use crate::state::AppState;

use super::check_auth;

// GET /api/notifications?recipient_id=
#[derive(Deserialize)]
pub struct NotificationsQuery {
    pub recipient_id: String,
    pub limit: Option<i64>,
}

pub async fn list_notifications(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<NotificationsQuery>,
) -> AppResult<Json<Vec<Notification>>> {
    check_auth(&headers, &state.config.admin_token)?;

    let limit = query.limit.unwrap_or(50).clamp(1, 500);
    let notifications = {
        let db = state.db.lock()?;
        queries::get_notifications_for(&db, &query.recipient_id, limit)?
    };

    Ok(Json(notifications))
}

// GET /api/notifications/events (SSE, one recipient)
#[derive(Deserialize)]
pub struct SseQuery {
    pub recipient_id: String,
    pub token: Option<String>,
    pub last_id: Option<i64>,
}

pub async fn events_stream(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SseQuery>,
) -> AppResult<Sse<impl tokio_stream::Stream<Item = Result<Event, Infallible>>>> {
    // Auth via query param (EventSource can't set headers)
    let token = query.token.as_deref().unwrap_or("");
    if token.is_empty() || token != state.config.admin_token {
        return Err(AppError::Unauthorized);
    }

    let recipient_id = query.recipient_id;
    let last_id = query.last_id.unwrap_or(0);

    // Subscribe before the catch-up read so nothing falls in between
    let rx = state.notifications_tx.subscribe();

    let catchup = {
        let db = state.db.lock()?;
        queries::get_notifications_since(&db, &recipient_id, last_id)?
    };
    let newest_caught_up = catchup.last().map(|n| n.id).unwrap_or(last_id);

    let catchup_stream = tokio_stream::iter(catchup.into_iter().map(|n| Ok::<_, Infallible>(to_event(&n))));

    let live_stream = BroadcastStream::new(rx).filter_map(move |result| match result {
        Ok(n) if n.recipient_id == recipient_id && n.id > newest_caught_up => {
            Some(Ok::<_, Infallible>(to_event(&n)))
        }
        Ok(_) => None,
        Err(tokio_stream::wrappers::errors::BroadcastStreamRecvError::Lagged(skipped)) => {
            tracing::warn!(skipped, "notification stream lagged");
            None
        }
    });

    let keepalive_stream = tokio_stream::StreamExt::map(
        tokio_stream::wrappers::IntervalStream::new(tokio::time::interval(Duration::from_secs(30))),
        |_| Ok(Event::default().comment("keepalive")),
    );

    let combined = catchup_stream.chain(live_stream);
    let merged = StreamExt::merge(combined, keepalive_stream);

    Ok(Sse::new(merged))
}

fn to_event(notification: &Notification) -> Event {
    Event::default()
        .id(notification.id.to_string())
        .event(notification.kind.as_str())
        .data(event_payload(notification))
}

/// JSON for the SSE `data:` field. Encoding failures are logged and sent empty.
fn event_payload(notification: &Notification) -> String {
    match serde_json::to_string(notification) {
        Ok(data) => data,
        Err(e) => {
            tracing::warn!(
                notification_id = notification.id,
                error = %e,
                "failed to encode notification"
            );
            String::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NotificationKind;

    #[test]
    fn test_event_payload_is_notification_json() {
        let notification = Notification {
            id: 7,
            recipient_id: "farmer-a".to_string(),
            kind: NotificationKind::BookingConfirmed,
            title: "Booking confirmed".to_string(),
            message: "Green Valley Traders confirmed your booking".to_string(),
            booking_id: "bk-1".to_string(),
            created_at: crate::models::now(),
        };

        let payload: serde_json::Value =
            serde_json::from_str(&event_payload(&notification)).unwrap();
        assert_eq!(payload["id"], 7);
        assert_eq!(payload["kind"], "booking_confirmed");
        assert_eq!(payload["booking_id"], "bk-1");
    }
}
