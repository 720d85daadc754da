//! WebSocket State Stream
//!
//! Pushes the race state to dashboard clients. A client receives a
//! `connected` message, then a `snapshot` of the whole table, then a fresh
//! `snapshot` after every change the feed or simulator commits. Sending
//! `{"type": "ping"}` gets a `pong`.
//!
//! ## Example
//!
//! ```javascript
//! // Browser
//! const ws = new WebSocket('ws://localhost:8082/api/v1/ws');
//!
//! ws.onmessage = (event) => {
//!   const msg = JSON.parse(event.data);
//!   if (msg.type === 'snapshot') render(msg.state);
//! };
//! ```

mod handler;
mod messages;

pub use handler::websocket_handler;
pub use messages::{reply_to, ClientMessage, ServerMessage};
