//! WebSocket client session management.

use futures_util::{SinkExt, StreamExt};
use roomcast_server::infrastructure::dto::websocket::ChatMessage;
use roomcast_shared::time::now_millis;
use rustyline::{DefaultEditor, error::ReadlineError};
use tokio::sync::mpsc;
use tokio_tungstenite::{
    connect_async,
    tungstenite::{Error as WsError, http::StatusCode, protocol::Message},
};

use crate::error::ClientError;

use super::{formatter::MessageFormatter, ui::redisplay_prompt};

/// How a session ended from the reader's point of view
enum ReadOutcome {
    ClosedByServer,
    Lost,
}

/// Map a failed handshake to a client error.
fn handshake_error(error: WsError, room: &str) -> ClientError {
    match error {
        WsError::Http(response) => match response.status() {
            StatusCode::UNAUTHORIZED => ClientError::Unauthorized,
            StatusCode::NOT_FOUND | StatusCode::BAD_REQUEST => {
                ClientError::RoomNotFound(room.to_string())
            }
            status => ClientError::ConnectionError(format!("handshake failed with {}", status)),
        },
        other => ClientError::ConnectionError(other.to_string()),
    }
}

/// Render one relayed text frame.
fn render_text(text: &str) -> String {
    match serde_json::from_str::<ChatMessage>(text) {
        Ok(message) => MessageFormatter::format_chat_message(
            message.sender.as_deref(),
            &message.content,
            message.timestamp,
        ),
        Err(_) => MessageFormatter::format_raw_message(text),
    }
}

/// Run one WebSocket session until the user quits or the connection ends.
///
/// Returns `Ok(())` when the user ended input (Ctrl+C / Ctrl+D).
pub async fn run_client_session(url: &str, room: &str, username: &str) -> Result<(), ClientError> {
    let (ws_stream, _response) = connect_async(url)
        .await
        .map_err(|e| handshake_error(e, room))?;

    tracing::info!("Connected to room {}", room);
    print!("{}", MessageFormatter::format_joined(username, room));

    let (mut write, mut read) = ws_stream.split();

    let username_for_read = username.to_string();
    let mut read_task = tokio::spawn(async move {
        while let Some(message) = read.next().await {
            match message {
                Ok(Message::Text(text)) => {
                    print!("{}", render_text(&text));
                    redisplay_prompt(&username_for_read);
                }
                Ok(Message::Binary(data)) => {
                    print!("{}", MessageFormatter::format_binary_message(data.len()));
                    redisplay_prompt(&username_for_read);
                }
                Ok(Message::Close(_)) => {
                    tracing::info!("Server closed the connection");
                    return ReadOutcome::ClosedByServer;
                }
                Err(e) => {
                    tracing::warn!("WebSocket read error: {}", e);
                    return ReadOutcome::Lost;
                }
                _ => {}
            }
        }
        ReadOutcome::Lost
    });

    // rustyline is synchronous, so it runs on its own thread
    let (input_tx, mut input_rx) = mpsc::unbounded_channel::<String>();
    let prompt = format!("{}> ", username);
    let _readline_handle = std::thread::spawn(move || {
        let mut rl = match DefaultEditor::new() {
            Ok(rl) => rl,
            Err(e) => {
                eprintln!("Failed to initialize readline: {}", e);
                return;
            }
        };

        loop {
            match rl.readline(&prompt) {
                Ok(line) => {
                    let line = line.trim();
                    if !line.is_empty() {
                        rl.add_history_entry(line).ok();
                        if input_tx.send(line.to_string()).is_err() {
                            break;
                        }
                    }
                }
                Err(ReadlineError::Interrupted) => {
                    tracing::info!("Interrupted");
                    break;
                }
                Err(ReadlineError::Eof) => {
                    tracing::info!("EOF");
                    break;
                }
                Err(err) => {
                    tracing::error!("Readline error: {}", err);
                    break;
                }
            }
        }
    });

    let username_for_write = username.to_string();
    let mut write_task = tokio::spawn(async move {
        while let Some(line) = input_rx.recv().await {
            let json = match serde_json::to_string(&ChatMessage::new(line)) {
                Ok(json) => json,
                Err(e) => {
                    tracing::error!("Failed to serialize message: {}", e);
                    continue;
                }
            };

            if let Err(e) = write.send(Message::Text(json.into())).await {
                tracing::warn!("Failed to send message: {}", e);
                return false;
            }

            print!("\n{}", MessageFormatter::format_sent_confirmation(now_millis()));
            redisplay_prompt(&username_for_write);
        }

        let _ = write.send(Message::Close(None)).await;
        true
    });

    tokio::select! {
        read_result = &mut read_task => {
            write_task.abort();
            match read_result {
                Ok(ReadOutcome::ClosedByServer) => Err(ClientError::ClosedByServer),
                _ => Err(ClientError::ConnectionError("Connection lost".to_string())),
            }
        }
        write_result = &mut write_task => {
            read_task.abort();
            match write_result {
                Ok(true) => Ok(()),
                _ => Err(ClientError::ConnectionError("Connection lost".to_string())),
            }
        }
    }
}
