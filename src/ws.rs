use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::IntoResponse;
use futures::{sink::SinkExt, stream::StreamExt};
use log;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::errors::NetworkError;
use crate::messages::{ClientMessage, ServerMessage};
use crate::service::RoomService;

/// Upgrade an incoming request to the game socket.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(service): State<RoomService>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_connection(socket, service))
}

/// Drive one connection: a writer task drains the connection's outbound
/// channel while the reader loop feeds decoded events to the coordinator.
/// Identity is established by the first create/join event; until then the
/// session id resolves to nothing and events are dropped upstream.
async fn handle_connection(socket: WebSocket, service: RoomService) {
    let session_id = format!("conn_{}", Uuid::new_v4());
    log::info!("🔌 WebSocket connected: {}", session_id);

    let (mut sender, mut receiver) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<ServerMessage>();

    let writer_session = session_id.clone();
    let mut write_task = tokio::spawn(async move {
        while let Some(message) = rx.recv().await {
            let json = match serde_json::to_string(&message) {
                Ok(json) => json,
                Err(e) => {
                    let err = NetworkError::SerializationFailed {
                        details: e.to_string(),
                    };
                    log::error!("{} on {}", err, writer_session);
                    continue;
                }
            };
            if sender.send(Message::Text(json.into())).await.is_err() {
                break; // client disconnected
            }
        }
    });

    let reader_service = service.clone();
    let reader_session = session_id.clone();
    let mut read_task = tokio::spawn(async move {
        while let Some(Ok(message)) = receiver.next().await {
            match message {
                Message::Text(text) => match serde_json::from_str::<ClientMessage>(&text) {
                    Ok(event) => reader_service.dispatch(&reader_session, event, &tx).await,
                    Err(e) => {
                        // malformed frames are logged and dropped, never fatal
                        let err = NetworkError::DeserializationFailed {
                            details: e.to_string(),
                        };
                        log::warn!("Dropping event from {}: {}", reader_session, err);
                    }
                },
                Message::Close(_) => break,
                _ => {
                    // ignore pings, pongs and binary frames
                }
            }
        }
    });

    // whichever side finishes first tears the other down
    tokio::select! {
        _ = &mut write_task => {
            read_task.abort();
        }
        _ = &mut read_task => {
            write_task.abort();
        }
    }

    service.disconnect(&session_id).await;
    log::info!("WebSocket connection {} closed", session_id);
}
