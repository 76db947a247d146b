//! WebSocket message DTOs.

use serde::{Deserialize, Serialize};

/// A chat message relayed between members of a room.
///
/// `content` is free-form. `sender` is overwritten by the relay with the
/// authenticated identity of the sending connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,
}

impl ChatMessage {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            sender: None,
            timestamp: None,
        }
    }
}
