//! WebSocket streaming of cycle reports.
use crate::state::AppState;
use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    response::IntoResponse,
};
use serde::Deserialize;
use std::sync::Arc;

/// Handler for WebSocket connections.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    Query(params): Query<WsQuery>,
) -> axum::response::Response {
    let aircraft_filter = params.aircraft_id;
    ws.on_upgrade(move |socket| handle_socket(socket, state, aircraft_filter))
        .into_response()
}

#[derive(Debug, Deserialize, Default)]
pub struct WsQuery {
    /// Only forward reports that involve this aircraft
    aircraft_id: Option<String>,
}

async fn handle_socket(mut socket: WebSocket, state: Arc<AppState>, aircraft_filter: Option<String>) {
    let mut rx = state.tx.subscribe();

    loop {
        tokio::select! {
            incoming = socket.recv() => {
                match incoming {
                    Some(Ok(Message::Ping(payload))) => {
                        if socket.send(Message::Pong(payload)).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) => break,
                    Some(Ok(_)) => {}
                    Some(Err(_)) | None => break,
                }
            }
            event = rx.recv() => {
                match event {
                    Ok(event) => {
                        if let Some(aircraft_id) = aircraft_filter.as_deref() {
                            if !event.involves(aircraft_id) {
                                continue;
                            }
                        }
                        if socket.send(Message::Text(event.payload.as_ref().to_owned())).await.is_err() {
                            break;
                        }
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                        // Only the newest report matters.
                        tracing::debug!("WebSocket client lagged by {} report(s)", skipped);
                        continue;
                    }
                    Err(_) => break,
                }
            }
        }
    }
}
