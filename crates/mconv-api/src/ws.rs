//! WebSocket progress feed.
//!
//! Every connected client sees every job's progress. The socket is
//! read-only from the client's point of view; incoming text is ignored.

use std::sync::atomic::{AtomicI64, Ordering};
use std::time::{Duration, Instant};

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::http::Uri;
use axum::response::IntoResponse;
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use mconv_models::WsMessage;
use mconv_worker::Observer;
use tokio::time::interval;
use tracing::{debug, info, warn};

use crate::metrics;
use crate::state::AppState;

/// Global counter for active WebSocket connections.
static ACTIVE_WS_CONNECTIONS: AtomicI64 = AtomicI64::new(0);

const WS_HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);
const WS_CLIENT_TIMEOUT: Duration = Duration::from_secs(90);

/// `GET /` and `GET /ws`: upgrade and subscribe to progress.
pub async fn ws_progress(
    ws: WebSocketUpgrade,
    uri: Uri,
    State(state): State<AppState>,
) -> impl IntoResponse {
    let endpoint = uri.path().to_string();
    ws.on_upgrade(move |socket| async move {
        let observer = state.broadcast.register();
        handle_socket(socket, observer, endpoint).await;
    })
}

async fn handle_socket(socket: WebSocket, mut observer: Observer, endpoint: String) {
    let active = ACTIVE_WS_CONNECTIONS.fetch_add(1, Ordering::Relaxed) + 1;
    metrics::record_ws_connection(&endpoint);
    metrics::set_ws_active_connections(active);
    info!(observer_id = observer.id(), endpoint = %endpoint, "WebSocket connected");

    let (mut sender, mut receiver) = socket.split();
    let mut heartbeat = interval(WS_HEARTBEAT_INTERVAL);
    heartbeat.tick().await;
    let mut last_seen = Instant::now();

    loop {
        tokio::select! {
            message = observer.recv() => {
                let Some(message) = message else { break };
                if !send_json(&mut sender, &message, &endpoint).await {
                    break;
                }
            }
            incoming = receiver.next() => {
                match incoming {
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(Message::Pong(_))) => last_seen = Instant::now(),
                    Some(Ok(_)) => {
                        last_seen = Instant::now();
                        metrics::record_ws_message_received(&endpoint);
                        debug!(observer_id = observer.id(), "Ignoring client message");
                    }
                    Some(Err(e)) => {
                        debug!(observer_id = observer.id(), error = %e, "WebSocket receive error");
                        break;
                    }
                }
            }
            _ = heartbeat.tick() => {
                if last_seen.elapsed() > WS_CLIENT_TIMEOUT {
                    warn!(observer_id = observer.id(), "WebSocket client timed out");
                    break;
                }
                if sender.send(Message::Ping(Vec::new())).await.is_err() {
                    break;
                }
            }
        }
    }

    let _ = sender.close().await;
    let active = ACTIVE_WS_CONNECTIONS.fetch_sub(1, Ordering::Relaxed) - 1;
    metrics::set_ws_active_connections(active);
    info!(observer_id = observer.id(), "WebSocket disconnected");
    // Dropping the observer deregisters it
}

async fn send_json(
    sender: &mut SplitSink<WebSocket, Message>,
    message: &WsMessage,
    endpoint: &str,
) -> bool {
    let json = match serde_json::to_string(message) {
        Ok(json) => json,
        Err(e) => {
            warn!(error = %e, "Failed to serialize WebSocket message");
            return true;
        }
    };
    if sender.send(Message::Text(json)).await.is_err() {
        return false;
    }
    metrics::record_ws_message_sent(endpoint, message.message_type().as_str());
    true
}
