//! Domain logic for client-side operations.
//!
//! Pure functions without side effects, kept separate so they are easy to test.

use crate::error::ClientError;

/// Check if the client should exit immediately based on the error type.
///
/// Credential and room errors will not fix themselves on retry, and a close
/// initiated by the server means another connection took over or the
/// server is going away.
pub fn should_exit_immediately(error: &ClientError) -> bool {
    matches!(
        error,
        ClientError::InvalidCredentials
            | ClientError::RoomNotFound(_)
            | ClientError::ClosedByServer
            | ClientError::InvalidUrl(_)
    )
}

/// Check if the client should attempt to reconnect.
///
/// `current_attempt` is 0-indexed.
pub fn should_attempt_reconnect(
    error: &ClientError,
    current_attempt: u32,
    max_attempts: u32,
) -> bool {
    if should_exit_immediately(error) {
        return false;
    }

    current_attempt < max_attempts
}

/// Build the `/ws/connect` URL from the HTTP base URL of the server.
///
/// `http://` becomes `ws://` and `https://` becomes `wss://`.
pub fn websocket_url(server_url: &str, room: &str, token: &str) -> Result<String, ClientError> {
    let base = server_url.trim_end_matches('/');
    let ws_base = if let Some(rest) = base.strip_prefix("https://") {
        format!("wss://{rest}")
    } else if let Some(rest) = base.strip_prefix("http://") {
        format!("ws://{rest}")
    } else {
        return Err(ClientError::InvalidUrl(server_url.to_string()));
    };

    Ok(format!("{ws_base}/ws/connect?room={room}&token={token}"))
}
