use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use futures::{SinkExt, StreamExt};
use serde_json::json;
use tracing::debug;

use crate::events::ObserverRegistry;
use crate::AppState;

/// Upgrades the connection and attaches it to the order-updates fan-out.
/// New observers get a connection acknowledgment but no backlog; they are
/// expected to reconcile with a full re-fetch.
pub async fn order_updates_ws(State(state): State<AppState>, ws: WebSocketUpgrade) -> Response {
    let registry = state.observers.clone();
    ws.on_upgrade(move |socket| handle_socket(socket, registry))
}

async fn handle_socket(socket: WebSocket, registry: Arc<ObserverRegistry>) {
    let (observer_id, mut events) = registry.subscribe();
    let (mut sink, mut stream) = socket.split();

    if sink
        .send(Message::Text(ObserverRegistry::connection_ack()))
        .await
        .is_err()
    {
        registry.unsubscribe(observer_id);
        return;
    }

    loop {
        tokio::select! {
            event = events.recv() => {
                match event {
                    Some(payload) => {
                        if sink.send(Message::Text(payload)).await.is_err() {
                            break;
                        }
                    }
                    // Registry side closed the channel.
                    None => break,
                }
            }
            incoming = stream.next() => {
                match incoming {
                    Some(Ok(Message::Text(text))) => {
                        if let Some(pong) = answer_ping(&text) {
                            if sink.send(Message::Text(pong)).await.is_err() {
                                break;
                            }
                        }
                    }
                    Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                    // Binary frames and protocol-level ping/pong are ignored.
                    Some(Ok(_)) => {}
                }
            }
        }
    }

    registry.unsubscribe(observer_id);
    debug!(observer_id = %observer_id, "Order updates socket closed");
}

/// Application-level keep-alive: `{"type":"ping"}` gets a pong echoing the
/// client's timestamp. Anything else is ignored.
fn answer_ping(text: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(text).ok()?;
    if value.get("type")?.as_str()? != "ping" {
        return None;
    }
    Some(
        json!({
            "type": "pong",
            "timestamp": value.get("timestamp").cloned().unwrap_or(serde_json::Value::Null),
        })
        .to_string(),
    )
}
