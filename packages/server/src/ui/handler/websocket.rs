//! WebSocket connection handler.
//!
//! Authentication, room lookup and preemption run before the upgrade, so a
//! rejected request gets a plain HTTP error and leaves no state behind.

use std::{sync::Arc, time::Duration};

use axum::{
    extract::{
        Query, State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    http::HeaderMap,
    response::Response,
};
use futures_util::{
    sink::SinkExt,
    stream::{SplitSink, StreamExt},
};
use tokio::sync::mpsc;

use crate::{
    domain::{ConnectionState, InboundFrame, OutboundFrame, RoomId},
    infrastructure::dto::http::ConnectQuery,
    ui::{
        error::ApiError,
        identity::{token_from_headers, token_from_query},
        state::AppState,
    },
    usecase::PendingConnection,
};

/// Bounded wait for the close notification before the socket is dropped.
const CLOSE_TIMEOUT: Duration = Duration::from_secs(1);

/// `GET /ws/connect?room=<id>&token=<token>`
pub async fn connect_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    Query(query): Query<ConnectQuery>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let room = query
        .room
        .as_deref()
        .ok_or_else(|| ApiError::BadRequest("missing room id".to_string()))?;
    let room_id = RoomId::parse(room).map_err(|e| ApiError::BadRequest(e.to_string()))?;
    let token = token_from_query(&query).or_else(|| token_from_headers(&headers));

    let pending = state
        .connection_lifecycle
        .prepare(token.as_deref(), room_id)
        .await?;

    tracing::debug!(
        "Connection '{}' of '{}': {:?}",
        pending.id(),
        pending.username(),
        ConnectionState::Handshaking
    );
    let failed_id = pending.id().clone();
    let lifecycle = state.connection_lifecycle.clone();

    Ok(ws
        .on_failed_upgrade(move |e| {
            tracing::warn!("WebSocket upgrade failed: {}", e);
            tokio::spawn(async move { lifecycle.abort(&failed_id).await });
        })
        .on_upgrade(move |socket| handle_socket(socket, state, pending)))
}

/// Forwards outbound frames to the socket until a close is requested.
fn pusher_loop(
    mut rx: mpsc::UnboundedReceiver<OutboundFrame>,
    mut sender: SplitSink<WebSocket, Message>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(frame) = rx.recv().await {
            match frame {
                OutboundFrame::Text(text) => {
                    if sender.send(Message::Text(text.into())).await.is_err() {
                        break;
                    }
                }
                OutboundFrame::Close => {
                    let _ = tokio::time::timeout(CLOSE_TIMEOUT, sender.send(Message::Close(None)))
                        .await;
                    break;
                }
            }
        }
        let _ = sender.close().await;
    })
}

fn to_inbound(message: Message) -> InboundFrame {
    match message {
        Message::Text(text) => InboundFrame::Text(text.as_str().to_owned()),
        Message::Binary(bytes) => InboundFrame::Binary(bytes.to_vec()),
        Message::Ping(_) => InboundFrame::Ping,
        Message::Pong(_) => InboundFrame::Pong,
        Message::Close(_) => InboundFrame::Close,
    }
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>, pending: PendingConnection) {
    let (mut sender, receiver) = socket.split();
    let (tx, rx) = mpsc::unbounded_channel();

    let lifecycle = state.connection_lifecycle.clone();
    let connection = match lifecycle.register(pending, tx).await {
        Ok(connection) => connection,
        Err(e) => {
            tracing::info!("Closing connection rejected after upgrade: {}", e);
            let _ =
                tokio::time::timeout(CLOSE_TIMEOUT, sender.send(Message::Close(None))).await;
            return;
        }
    };

    let send_task = pusher_loop(rx, sender);

    let inbound = receiver.map(|result| result.map(to_inbound));
    lifecycle.run(connection, inbound).await;

    if tokio::time::timeout(CLOSE_TIMEOUT * 2, send_task).await.is_err() {
        tracing::warn!("Writer task did not finish in time");
    }
}
