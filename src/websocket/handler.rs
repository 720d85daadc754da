//! WebSocket Handler
//!
//! Upgrades the request, then streams a state snapshot on connect and after
//! every committed change until the client goes away.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use futures_util::{stream::SplitSink, SinkExt, StreamExt};
use std::sync::Arc;

use super::messages::{reply_to, ServerMessage};
use crate::api::AppState;
use crate::store::StateStore;

/// WebSocket upgrade handler
pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> Response {
    let store = state.store.clone();
    ws.on_upgrade(move |socket| handle_socket(socket, store))
}

/// Serialize and send one message; `false` once the socket is gone
async fn send(sender: &mut SplitSink<WebSocket, Message>, message: &ServerMessage) -> bool {
    match serde_json::to_string(message) {
        Ok(text) => sender.send(Message::Text(text)).await.is_ok(),
        Err(e) => {
            tracing::error!(error = %e, "Failed to serialize message");
            true
        }
    }
}

/// Handle an established WebSocket connection
async fn handle_socket(socket: WebSocket, store: StateStore) {
    let (mut sender, mut receiver) = socket.split();
    let connection_id = uuid::Uuid::new_v4().to_string();
    let mut updates = store.subscribe();

    let connected = ServerMessage::Connected {
        connection_id: connection_id.clone(),
    };
    let initial = ServerMessage::snapshot(&updates.borrow_and_update());
    if !send(&mut sender, &connected).await || !send(&mut sender, &initial).await {
        tracing::debug!(connection_id = %connection_id, "Client left before the first snapshot");
        return;
    }

    tracing::debug!(connection_id = %connection_id, "WebSocket client connected");

    loop {
        tokio::select! {
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
                let message = ServerMessage::snapshot(&updates.borrow_and_update());
                if !send(&mut sender, &message).await {
                    break;
                }
            }
            incoming = receiver.next() => {
                let reply = match incoming {
                    Some(Ok(Message::Text(text))) => reply_to(&text),
                    Some(Ok(Message::Binary(_))) => ServerMessage::Error {
                        message: "Binary messages not supported".to_string(),
                    },
                    // Axum answers protocol pings itself
                    Some(Ok(Message::Ping(_))) | Some(Ok(Message::Pong(_))) => continue,
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(e)) => {
                        tracing::debug!(connection_id = %connection_id, error = %e, "WebSocket receive error");
                        break;
                    }
                };
                if !send(&mut sender, &reply).await {
                    break;
                }
            }
        }
    }

    tracing::debug!(connection_id = %connection_id, "WebSocket client disconnected");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::build_router;
    use crate::config::ApiConfig;
    use crate::store::Writer;
    use serde_json::Value;
    use std::time::Duration;
    use tokio::net::TcpStream;
    use tokio_tungstenite::{
        connect_async, tungstenite::Message as WsMessage, MaybeTlsStream, WebSocketStream,
    };

    type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

    async fn connect(store: StateStore) -> Client {
        let app = build_router(AppState::new(store, ApiConfig::default()));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let (client, _) = connect_async(format!("ws://{}/api/v1/ws", addr))
            .await
            .unwrap();
        client
    }

    /// Next text frame as JSON
    async fn next_json(client: &mut Client) -> Value {
        tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                match client.next().await.unwrap().unwrap() {
                    WsMessage::Text(text) => return serde_json::from_str(&text).unwrap(),
                    _ => continue,
                }
            }
        })
        .await
        .expect("no message within 5s")
    }

    #[tokio::test]
    async fn test_connect_sends_connected_then_snapshot() {
        let store = StateStore::seeded();
        let mut client = connect(store).await;

        let first = next_json(&mut client).await;
        assert_eq!(first["type"], "connected");
        assert!(first["connection_id"].as_str().is_some_and(|id| !id.is_empty()));

        let second = next_json(&mut client).await;
        assert_eq!(second["type"], "snapshot");
        assert_eq!(second["state"]["standings"].as_array().unwrap().len(), 10);
        assert_eq!(second["state"]["status"]["connected"], false);
    }

    #[tokio::test]
    async fn test_store_change_pushes_snapshot() {
        let store = StateStore::seeded();
        let mut client = connect(store.clone()).await;
        next_json(&mut client).await;
        next_json(&mut client).await;

        let changed = store.update(Writer::Feed, |state| {
            let mut next = state.clone();
            next.standings.truncate(2);
            Some(next)
        });
        assert!(changed);

        let pushed = next_json(&mut client).await;
        assert_eq!(pushed["type"], "snapshot");
        assert_eq!(pushed["state"]["standings"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_ping_gets_pong_and_bad_frames_get_errors() {
        let mut client = connect(StateStore::seeded()).await;
        next_json(&mut client).await;
        next_json(&mut client).await;

        client
            .send(WsMessage::Text(r#"{"type":"ping"}"#.to_string()))
            .await
            .unwrap();
        assert_eq!(next_json(&mut client).await["type"], "pong");

        client
            .send(WsMessage::Text("not json".to_string()))
            .await
            .unwrap();
        let reply = next_json(&mut client).await;
        assert_eq!(reply["type"], "error");
        assert!(reply["message"]
            .as_str()
            .unwrap()
            .starts_with("Invalid message format"));

        client.send(WsMessage::Binary(vec![1, 2, 3])).await.unwrap();
        let reply = next_json(&mut client).await;
        assert_eq!(reply["message"], "Binary messages not supported");
    }
}
