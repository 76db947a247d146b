//! SQLite Directory Repository 実装（サーバー・ルームの参照）

use async_trait::async_trait;
use rusqlite::{OptionalExtension, Row, params};

use super::storage_error;
use crate::{
    domain::{ChatRoom, ChatServer, DirectoryRepository, RepositoryError, RoomId, ServerId},
    infrastructure::db::SharedConnection,
};

pub struct SqliteDirectoryRepository {
    conn: SharedConnection,
}

impl SqliteDirectoryRepository {
    pub fn new(conn: SharedConnection) -> Self {
        Self { conn }
    }
}

fn server_from_row(row: &Row<'_>) -> rusqlite::Result<ChatServer> {
    Ok(ChatServer {
        id: ServerId::new(row.get("id")?),
        name: row.get("name")?,
        description: row.get("description")?,
    })
}

fn room_from_row(row: &Row<'_>) -> rusqlite::Result<ChatRoom> {
    Ok(ChatRoom {
        id: RoomId::new(row.get("id")?),
        name: row.get("name")?,
        description: row.get("description")?,
        server_id: ServerId::new(row.get("server_id")?),
    })
}

#[async_trait]
impl DirectoryRepository for SqliteDirectoryRepository {
    async fn list_servers(&self) -> Result<Vec<ChatServer>, RepositoryError> {
        let conn = self.conn.lock().await;
        let mut stmt = conn
            .prepare("SELECT id, name, description FROM chat_server ORDER BY id")
            .map_err(storage_error)?;
        stmt.query_map([], server_from_row)
            .map_err(storage_error)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(storage_error)
    }

    async fn find_server(&self, id: ServerId) -> Result<Option<ChatServer>, RepositoryError> {
        let conn = self.conn.lock().await;
        conn.query_row(
            "SELECT id, name, description FROM chat_server WHERE id = ?1",
            params![id.value()],
            server_from_row,
        )
        .optional()
        .map_err(storage_error)
    }

    async fn list_rooms(&self, server_id: ServerId) -> Result<Vec<ChatRoom>, RepositoryError> {
        let conn = self.conn.lock().await;
        let mut stmt = conn
            .prepare(
                "SELECT id, name, description, server_id FROM chat_room
                 WHERE server_id = ?1 ORDER BY id",
            )
            .map_err(storage_error)?;
        stmt.query_map(params![server_id.value()], room_from_row)
            .map_err(storage_error)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(storage_error)
    }

    async fn find_room(&self, id: RoomId) -> Result<Option<ChatRoom>, RepositoryError> {
        let conn = self.conn.lock().await;
        conn.query_row(
            "SELECT id, name, description, server_id FROM chat_room WHERE id = ?1",
            params![id.value()],
            room_from_row,
        )
        .optional()
        .map_err(storage_error)
    }
}
