//! WebSocket Message Types
//!
//! Message formats exchanged with dashboard clients.

use serde::{Deserialize, Serialize};

use crate::store::RaceState;

/// Messages sent from client to server
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Ping for keepalive
    Ping,
}

/// Messages sent from server to client
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Connection established
    Connected {
        /// Unique connection identifier
        connection_id: String,
    },
    /// Full state, sent on connect and after every change
    Snapshot { state: RaceState },
    /// Pong response to ping
    Pong,
    /// Error message
    Error {
        /// Error description
        message: String,
    },
}

impl ServerMessage {
    pub fn snapshot(state: &RaceState) -> Self {
        ServerMessage::Snapshot {
            state: state.clone(),
        }
    }
}

/// Reply to a text frame from the client
pub fn reply_to(text: &str) -> ServerMessage {
    match serde_json::from_str::<ClientMessage>(text) {
        Ok(ClientMessage::Ping) => ServerMessage::Pong,
        Err(e) => ServerMessage::Error {
            message: format!("Invalid message format: {}", e),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_message_deserialize_ping() {
        let json = r#"{"type": "ping"}"#;
        let msg: ClientMessage = serde_json::from_str(json).unwrap();
        assert!(matches!(msg, ClientMessage::Ping));
    }

    #[test]
    fn test_reply_to() {
        assert!(matches!(reply_to(r#"{"type":"ping"}"#), ServerMessage::Pong));
        match reply_to(r#"{"type":"subscribe"}"#) {
            ServerMessage::Error { message } => assert!(message.starts_with("Invalid message format")),
            other => panic!("Expected Error, got {other:?}"),
        }
    }

    #[test]
    fn test_server_message_serialize_connected() {
        let msg = ServerMessage::Connected {
            connection_id: "abc-123".to_string(),
        };
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains("\"type\":\"connected\""));
        assert!(json.contains("\"connection_id\":\"abc-123\""));
    }

    #[test]
    fn test_server_message_serialize_snapshot() {
        let msg = ServerMessage::snapshot(&RaceState::seeded());
        let value: serde_json::Value = serde_json::to_value(&msg).unwrap();
        assert_eq!(value["type"], "snapshot");
        assert_eq!(value["state"]["standings"].as_array().unwrap().len(), 10);
        assert_eq!(value["state"]["status"]["data_source"], "none");
    }
}
