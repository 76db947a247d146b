//! Conversion logic between DTOs and domain entities.

use crate::domain::{ChatRoom, ChatServer, Session};
use crate::infrastructure::dto::http as dto;
use roomcast_shared::time::timestamp_to_jst_rfc3339;

impl From<ChatServer> for dto::ServerData {
    fn from(model: ChatServer) -> Self {
        Self {
            id: model.id.value(),
            name: model.name,
            description: model.description,
        }
    }
}

impl From<ChatRoom> for dto::RoomData {
    fn from(model: ChatRoom) -> Self {
        Self {
            id: model.id.value(),
            name: model.name,
            description: model.description,
            server_id: model.server_id.value(),
        }
    }
}

impl From<Session> for dto::LoginResponse {
    fn from(model: Session) -> Self {
        Self {
            expires_at: timestamp_to_jst_rfc3339(model.expires_at.value()),
            token: model.token.into_string(),
        }
    }
}
