use std::convert::Infallible;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use axum::extract::{Path, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::routing::get;
use axum::Router;
use futures::Stream;
use tokio::sync::broadcast::error::RecvError;

use crate::constants::SSE_KEEPALIVE_SECS;
use crate::response::AppError;
use crate::routes::sessions::parse_session_id;
use crate::sessions::SessionEvent;
use crate::state::AppState;

static SSE_CONNECTION_COUNT: AtomicUsize = AtomicUsize::new(0);

struct SseGuard;
impl Drop for SseGuard {
    fn drop(&mut self) {
        SSE_CONNECTION_COUNT.fetch_sub(1, Ordering::SeqCst);
    }
}

pub fn router() -> Router<AppState> {
    Router::new().route("/:id/events", get(sse_handler))
}

pub async fn sse_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, AppError> {
    let session_id = parse_session_id(&id)?;

    // 先订阅再检查会话，避免错过检查之后立即产生的事件
    let mut events = state.sessions().subscribe();
    if !state.sessions().contains(session_id).await {
        return Err(crate::sessions::RegistryError::NotFound(session_id).into());
    }

    let max_sse = state.config().limits.max_sse_connections;
    let current = SSE_CONNECTION_COUNT.fetch_add(1, Ordering::SeqCst);
    if current >= max_sse {
        SSE_CONNECTION_COUNT.fetch_sub(1, Ordering::SeqCst);
        return Err(AppError::too_many_requests("Too many SSE connections"));
    }
    let guard = SseGuard;

    let mut shutdown_rx = state.shutdown_rx();

    let stream = async_stream::stream! {
        let _guard = guard;
        tracing::debug!(session_id = %session_id, "sse stream opened");

        loop {
            let received = tokio::select! {
                received = events.recv() => received,
                _ = shutdown_rx.recv() => break,
            };

            match received {
                Ok(event) if event.session_id() == session_id => {
                    let closed = matches!(event, SessionEvent::Closed { .. });
                    if let Some(sse) = to_sse_event(&event) {
                        yield Ok(sse);
                    }
                    if closed {
                        break;
                    }
                }
                Ok(_) => {}
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(session_id = %session_id, skipped, "sse subscriber lagged");
                }
                Err(RecvError::Closed) => break,
            }
        }

        tracing::debug!(session_id = %session_id, "sse stream closed");
    };

    Ok(Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(SSE_KEEPALIVE_SECS))
            .text("keepalive"),
    ))
}

fn to_sse_event(event: &SessionEvent) -> Option<Event> {
    let (name, payload) = match event {
        SessionEvent::History { record, .. } => ("history", serde_json::to_value(record).ok()?),
        SessionEvent::CalibrationComplete {
            session_id,
            baseline,
        } => (
            "calibration_complete",
            serde_json::json!({ "sessionId": session_id, "baseline": baseline }),
        ),
        SessionEvent::Closed { session_id } => (
            "session_closed",
            serde_json::json!({ "sessionId": session_id }),
        ),
    };

    serde_json::to_string(&payload)
        .ok()
        .map(|json| Event::default().event(name).data(json))
}
