//! WebSocket session handling.
//!
//! One socket is one session. The handshake may carry a bearer token
//! (`GET /ws?token=...`); without one the session spectates. Two tasks
//! serve the connection: the send half merges coordinator pushes and
//! request replies onto the sink, the read half parses envelopes and
//! dispatches them, with a transport-level limiter ahead of parsing.
//! On close the coordinator tears the session down, which starts the
//! disconnect grace window for any seats it held.

use std::sync::Arc;

use axum::{
    extract::{
        Query, State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::Response,
};
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use pokerroom::session::{ClientEvent, Reply, ServerEvent, SessionCoordinator};

use super::{AppState, limiter::MessageLimiter};

#[derive(Debug, Deserialize)]
pub struct WsQuery {
    token: Option<String>,
}

pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    Query(query): Query<WsQuery>,
    State(state): State<AppState>,
) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, query.token, state.coordinator))
}

async fn handle_socket(
    socket: WebSocket,
    token: Option<String>,
    coordinator: Arc<SessionCoordinator>,
) {
    let (mut sink, mut stream) = socket.split();
    let (push_tx, mut push_rx) = mpsc::channel::<ServerEvent>(64);
    let (reply_tx, mut reply_rx) = mpsc::channel::<String>(32);

    let (session, identity) = coordinator.connect(token.as_deref(), push_tx).await;
    info!(
        session = %session,
        player = identity.as_ref().map(|i| i.id.to_string()),
        "websocket connected"
    );

    let send_task = tokio::spawn(async move {
        loop {
            tokio::select! {
                event = push_rx.recv() => {
                    let Some(event) = event else { break };
                    match serde_json::to_string(&event) {
                        Ok(json) => {
                            if sink.send(Message::Text(json.into())).await.is_err() {
                                break;
                            }
                        }
                        Err(e) => warn!("failed to serialize push: {e}"),
                    }
                }
                reply = reply_rx.recv() => {
                    let Some(json) = reply else { break };
                    if sink.send(Message::Text(json.into())).await.is_err() {
                        break;
                    }
                }
            }
        }
    });

    let mut burst = MessageLimiter::burst();
    let mut sustained = MessageLimiter::sustained();

    while let Some(message) = stream.next().await {
        match message {
            Ok(Message::Text(text)) => {
                if !burst.check() || !sustained.check() {
                    warn!(session = %session, "message flood, throttling");
                    let reply = Reply::err("too many messages, slow down");
                    if let Ok(json) = serde_json::to_string(&reply) {
                        let _ = reply_tx.send(json).await;
                    }
                    continue;
                }

                let reply = match serde_json::from_str::<ClientEvent>(&text) {
                    Ok(event) => coordinator.handle(session, event).await,
                    Err(e) => {
                        debug!(session = %session, "unparseable frame: {e}");
                        Reply::err("malformed event")
                    }
                };
                if let Ok(json) = serde_json::to_string(&reply)
                    && reply_tx.send(json).await.is_err()
                {
                    break;
                }
            }
            Ok(Message::Close(_)) => break,
            Ok(_) => {}
            Err(e) => {
                debug!(session = %session, "websocket error: {e}");
                break;
            }
        }
    }

    send_task.abort();
    coordinator.disconnect(session).await;
    info!(session = %session, "websocket disconnected");
}
