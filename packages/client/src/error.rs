//! Error types for the Roomcast client.

use thiserror::Error;

/// Client-specific errors
#[derive(Debug, Error)]
pub enum ClientError {
    /// Username or password was rejected by the server
    #[error("Invalid username or password")]
    InvalidCredentials,

    /// The session token was rejected during the WebSocket handshake
    #[error("Session token was rejected by the server")]
    Unauthorized,

    /// The requested room does not exist
    #[error("Room '{0}' does not exist")]
    RoomNotFound(String),

    /// The server closed the connection (shutdown or a newer connection took over)
    #[error("Connection closed by the server")]
    ClosedByServer,

    /// The server URL could not be turned into a WebSocket URL
    #[error("Invalid server URL: {0}")]
    InvalidUrl(String),

    /// Connection error
    #[error("Connection error: {0}")]
    ConnectionError(String),
}
