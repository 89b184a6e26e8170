//! Live job event streaming over WebSocket.
//!
//! One connection per job subscription. The subscriber is attached
//! before the HTTP upgrade so no event published during the handshake
//! is missed, and the socket closes after the terminal status event.

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, State};
use axum::response::IntoResponse;
use futures::{SinkExt, StreamExt};

use prospector_engine::{EventStream, JobId, RegistryError};

use crate::error::AppResult;
use crate::state::AppState;

/// GET /api/jobs/{id}/events
///
/// Upgrade to WebSocket and stream the job's events as JSON text
/// frames. Unknown job ids are rejected with 404 before the upgrade.
pub async fn job_events(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Path(job_id): Path<JobId>,
) -> AppResult<impl IntoResponse> {
    let stream = state
        .registry
        .bus()
        .subscribe(job_id)
        .ok_or(RegistryError::NotFound(job_id))?;

    Ok(ws.on_upgrade(move |socket| stream_events(socket, job_id, stream)))
}

/// Forward events to the socket until the stream ends or the client
/// disconnects.
async fn stream_events(socket: WebSocket, job_id: JobId, mut events: EventStream) {
    let conn_id = uuid::Uuid::new_v4().to_string();
    tracing::debug!(conn_id = %conn_id, job_id, "Job event subscriber connected");

    let (mut sink, mut inbound) = socket.split();

    loop {
        tokio::select! {
            event = events.recv() => {
                let Some(event) = event else {
                    // Terminal event delivered; close cleanly.
                    let _ = sink.send(Message::Close(None)).await;
                    break;
                };
                let text = match serde_json::to_string(&event) {
                    Ok(text) => text,
                    Err(e) => {
                        tracing::error!(job_id, error = %e, "Failed to serialize job event");
                        continue;
                    }
                };
                if sink.send(Message::Text(text.into())).await.is_err() {
                    tracing::debug!(conn_id = %conn_id, job_id, "Subscriber sink closed");
                    break;
                }
            }
            message = inbound.next() => {
                match message {
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {} // inbound frames are ignored
                    Some(Err(e)) => {
                        tracing::debug!(conn_id = %conn_id, error = %e, "Subscriber receive error");
                        break;
                    }
                }
            }
        }
    }

    tracing::debug!(conn_id = %conn_id, job_id, "Job event subscriber disconnected");
}
