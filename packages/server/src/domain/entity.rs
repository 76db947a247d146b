//! エンティティ

use super::value_object::{ConnectionId, RoomId, ServerId, SessionToken, Timestamp, Username};

/// ログインセッション
///
/// 1 つの Identity につき有効なセッションは高々 1 つ。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub username: Username,
    pub token: SessionToken,
    pub created_at: Timestamp,
    pub expires_at: Timestamp,
}

impl Session {
    pub fn new(
        username: Username,
        token: SessionToken,
        created_at: Timestamp,
        expires_at: Timestamp,
    ) -> Self {
        Self {
            username,
            token,
            created_at,
            expires_at,
        }
    }

    /// `now` 時点で期限切れかどうか（now >= expires_at で期限切れ）
    pub fn is_expired_at(&self, now: Timestamp) -> bool {
        now >= self.expires_at
    }
}

/// 「この Identity がこのルームに接続している」という永続レコード
///
/// (username, room_id) の組につき高々 1 つ。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionStat {
    pub id: ConnectionId,
    pub username: Username,
    pub room_id: RoomId,
}

impl ConnectionStat {
    pub fn new(id: ConnectionId, username: Username, room_id: RoomId) -> Self {
        Self {
            id,
            username,
            room_id,
        }
    }
}

/// 登録済みユーザー（パスワードハッシュは Infrastructure 層から出さない）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatUser {
    pub id: i64,
    pub name: String,
    pub username: Username,
}

/// チャットサーバー（ルームのまとまり）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatServer {
    pub id: ServerId,
    pub name: String,
    pub description: String,
}

/// チャットルーム（ブロードキャストの範囲）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatRoom {
    pub id: RoomId,
    pub name: String,
    pub description: String,
    pub server_id: ServerId,
}
