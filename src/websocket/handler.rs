use axum::{
    extract::{Extension, Path, State, ws::{Message, WebSocket, WebSocketUpgrade}},
    response::Response,
};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::colab::{DocumentView, NotificationEvent, SinkError};
use crate::models::{ReceivedMessage, SendMessage};
use crate::transport::Membership;
use crate::utils::scope_guard::AbortOnDrop;
use crate::websocket::msg_activity_handler::handle_activity_message;
use crate::websocket::msg_ping_handler::handle_ping_message;
use crate::websocket::msg_presence_handler::handle_presence_message;
use crate::websocket::view_task::run_view;
use crate::AppState;

/// WebSocket handler
pub async fn websocket_handler(
    Path(document): Path<String>,
    Extension(user): Extension<AuthUser>,
    State(state): State<AppState>,
    ws: WebSocketUpgrade,
) -> Response {
    info!("New WebSocket connection attempt for {} by {}", document, user.user_id);
    ws.on_upgrade(move |socket| handle_socket(socket, document, user, state))
}

/// Handle WebSocket connection
async fn handle_socket(socket: WebSocket, document: String, user: AuthUser, state: AppState) {

    // Generate unique connection ID to identify this client in the logs
    let connection_id = Uuid::new_v4().to_string();
    info!("WebSocket connection established for document: {} with connection_id: {}", document, connection_id);

    // Split the socket into sender and receiver
    let (mut sender, mut receiver) = socket.split();

    // Join and announce the user. Whatever happens from here on, the membership
    // is released when this function returns.
    let membership = Membership::join(state.hub.clone(), &document, &user.user_id);
    let channel = membership.channel().clone();
    if !membership.is_first() {
        debug!("{} already has a connection to {}", user.user_id, document);
    }

    // Subscribe before taking the snapshot so nothing falls in between
    let transport = channel.subscribe();
    let (sessions, items) = channel.snapshot();

    // Everything sent to the client goes through one queue
    let (outbound, mut outbound_rx) = mpsc::unbounded_channel::<SendMessage>();
    let sink = {
        let outbound = outbound.clone();
        move |event: NotificationEvent| -> Result<(), SinkError> {
            outbound.send(SendMessage::Notification(event)).map_err(|_| SinkError::Closed)
        }
    };

    let mut view = DocumentView::new(&document, &user.user_id, state.hub.options().clone(), Box::new(sink));
    view.restore(sessions, items);

    // Start a task that owns the view
    let mut view_task = AbortOnDrop(tokio::spawn(run_view(
        view,
        channel.clone(),
        transport,
        outbound.clone(),
        state.config.sweep_interval(),
    )));

    // Start a task that writes queued messages to the client
    let write_document = document.clone();
    let mut write_task = AbortOnDrop(tokio::spawn(async move {
        while let Some(msg) = outbound_rx.recv().await {
            let text = match serde_json::to_string(&msg) {
                Ok(text) => text,
                Err(e) => {
                    error!("Failed to serialize message for document {}: {}", write_document, e);
                    continue;
                }
            };
            if sender.send(Message::Text(text)).await.is_err() {
                break;
            }
        }
    }));

    // Start a task to listen to the websocket for incoming messages
    let read_channel = channel.clone();
    let read_document = document.clone();
    let user_id = user.user_id.clone();
    let mut read_task = AbortOnDrop(tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            let text = match msg {
                Message::Text(text) => text,
                Message::Close(_) => break,
                _ => continue,
            };

            // Parse the incoming message as JSON
            let json_msg: ReceivedMessage = match serde_json::from_str(&text) {
                Ok(json_msg) => json_msg,
                Err(e) => {
                    error!("Failed to parse message for document {}: {}", read_document, e);
                    continue;
                }
            };

            // Handle different message types
            match json_msg {
                ReceivedMessage::Presence(presence_msg) => {
                    handle_presence_message(presence_msg, &user_id, &read_channel);
                }
                ReceivedMessage::Activity(activity_msg) => {
                    handle_activity_message(activity_msg, &user_id, &read_channel);
                }
                ReceivedMessage::Ping(ping_msg) => {
                    handle_ping_message(&ping_msg, &read_document, &outbound);
                }
            }
        }
    }));

    // Wait for any task to finish; dropping the guards aborts the others
    tokio::select! {
        _ = &mut view_task.0 => debug!("View task ended for {}", connection_id),
        _ = &mut write_task.0 => debug!("Write task ended for {}", connection_id),
        _ = &mut read_task.0 => debug!("Read task ended for {}", connection_id),
    };
    info!("WebSocket connection {} terminated", connection_id);

    // Stop the remaining tasks before announcing the departure
    drop((view_task, write_task, read_task));
    drop(membership);
}
