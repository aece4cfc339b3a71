use std::sync::Arc;

use axum::{
    extract::ws::{Message, WebSocket, WebSocketUpgrade},
    response::IntoResponse,
    Extension,
};
use futures::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio::sync::{
    mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender},
    Mutex,
};

use crate::error::BookingError;
use crate::models::show_model::{ShowQuery, ShowResponse};
use crate::state::AppState;

/// Fan-out of seat and show changes to every connected WebSocket client.
#[derive(Clone, Default)]
pub struct LiveFeed {
    clients: Arc<Mutex<Vec<UnboundedSender<Message>>>>,
}

impl LiveFeed {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn subscribe(&self) -> UnboundedReceiver<Message> {
        let (tx, rx) = unbounded_channel();
        self.clients.lock().await.push(tx);
        rx
    }

    /// Sends `{action_type, status, data}` to every client, dropping the ones
    /// whose connection has gone away.
    pub async fn broadcast(&self, action_type: &str, status: &str, data: Value) {
        let text = envelope(action_type, status, data);
        let mut clients = self.clients.lock().await;
        clients.retain(|client| client.send(Message::Text(text.clone())).is_ok());
    }
}

fn envelope(action_type: &str, status: &str, data: Value) -> String {
    json!({
        "action_type": action_type,
        "status": status,
        "data": data
    })
    .to_string()
}

pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    Extension(state): Extension<AppState>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let (mut sender, mut receiver) = socket.split();
    let mut feed = state.feed.subscribe().await;
    let (reply_tx, mut reply_rx) = unbounded_channel::<Message>();

    let mut send_task = tokio::spawn(async move {
        loop {
            let message = tokio::select! {
                Some(message) = feed.recv() => message,
                Some(message) = reply_rx.recv() => message,
                else => break,
            };
            if let Err(e) = sender.send(message).await {
                tracing::debug!(error = %e, "WebSocket client went away");
                break;
            }
        }
    });

    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(Message::Text(text))) = receiver.next().await {
            let reply = answer(&state, &text).await;
            if reply_tx.send(Message::Text(reply)).is_err() {
                break;
            }
        }
    });

    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }
}

/// Handles one inbound request. Replies go to the requesting client only.
async fn answer(state: &AppState, text: &str) -> String {
    let request: Value = match serde_json::from_str(text) {
        Ok(value) => value,
        Err(_) => {
            return envelope("error", "error", json!({ "error": "Request is not valid JSON" }));
        }
    };

    match request["action"].as_str() {
        Some("get_shows") => {
            let query: ShowQuery =
                serde_json::from_value(request["data"].clone()).unwrap_or_default();
            let result = match query.to_filter() {
                Ok(filter) => state.shows.get_shows(&filter).await,
                Err(err) => Err(err),
            };
            match result {
                Ok(shows) => {
                    let shows: Vec<ShowResponse> = shows.into_iter().map(Into::into).collect();
                    envelope("get_shows", "success", json!(shows))
                }
                Err(BookingError::Internal(msg)) => {
                    tracing::error!(error = %msg, "WebSocket get_shows failed");
                    envelope("get_shows", "error", json!({ "error": "An internal error occurred" }))
                }
                Err(err) => envelope("get_shows", "error", json!({ "error": err.to_string() })),
            }
        }
        Some(other) => {
            tracing::debug!(action = other, "Unsupported WebSocket action");
            envelope(other, "error", json!({ "error": "Unsupported action" }))
        }
        None => envelope("error", "error", json!({ "error": "Action type is missing" })),
    }
}
