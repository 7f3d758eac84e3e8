use tracing::{debug, error};
use tokio::sync::mpsc::UnboundedSender;
use crate::models::{PingMessage, PongMessage, SendMessage};
use chrono::Utc;

/// Handle PingMessage
pub fn handle_ping_message(_ping_msg: &PingMessage, document: &str, outbound: &UnboundedSender<SendMessage>) {
    // Handle ping message - send a pong message back.
    debug!("Ping message received for document {}", document);

    // Reply with pong
    let pong = SendMessage::Pong(PongMessage { date: Utc::now().to_rfc3339() });
    if outbound.send(pong).is_err() {
        error!("Failed to send Pong message for document {}", document);
    }
}
