//! SQLite ConnectionStat Repository 実装

use async_trait::async_trait;
use rusqlite::{OptionalExtension, Row, params};

use super::storage_error;
use crate::{
    domain::{
        ConnectionId, ConnectionStat, ConnectionStatRepository, RepositoryError, RoomId, Username,
    },
    infrastructure::db::SharedConnection,
};

pub struct SqliteConnectionStatRepository {
    conn: SharedConnection,
}

impl SqliteConnectionStatRepository {
    pub fn new(conn: SharedConnection) -> Self {
        Self { conn }
    }
}

struct ConnectionStatRow {
    id: String,
    user_name: String,
    room_id: i64,
}

impl ConnectionStatRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            user_name: row.get("user_name")?,
            room_id: row.get("room_id")?,
        })
    }

    fn into_stat(self) -> Result<ConnectionStat, RepositoryError> {
        Ok(ConnectionStat::new(
            ConnectionId::new(self.id)?,
            Username::new(self.user_name)?,
            RoomId::new(self.room_id),
        ))
    }
}

#[async_trait]
impl ConnectionStatRepository for SqliteConnectionStatRepository {
    async fn acquire(
        &self,
        stat: &ConnectionStat,
    ) -> Result<Vec<ConnectionStat>, RepositoryError> {
        let mut conn = self.conn.lock().await;
        let tx = conn.transaction().map_err(storage_error)?;

        let preempted = {
            let mut stmt = tx
                .prepare(
                    "SELECT id, user_name, room_id FROM chat_user_conn_stats
                     WHERE user_name = ?1 AND room_id = ?2",
                )
                .map_err(storage_error)?;
            let rows = stmt
                .query_map(
                    params![stat.username.as_str(), stat.room_id.value()],
                    ConnectionStatRow::from_row,
                )
                .map_err(storage_error)?;
            rows.collect::<Result<Vec<_>, _>>().map_err(storage_error)?
        };

        tx.execute(
            "DELETE FROM chat_user_conn_stats WHERE user_name = ?1 AND room_id = ?2",
            params![stat.username.as_str(), stat.room_id.value()],
        )
        .map_err(storage_error)?;
        tx.execute(
            "INSERT INTO chat_user_conn_stats (id, user_name, room_id) VALUES (?1, ?2, ?3)",
            params![stat.id.as_str(), stat.username.as_str(), stat.room_id.value()],
        )
        .map_err(storage_error)?;
        tx.commit().map_err(storage_error)?;

        preempted
            .into_iter()
            .map(ConnectionStatRow::into_stat)
            .collect()
    }

    async fn release(&self, id: &ConnectionId) -> Result<bool, RepositoryError> {
        let conn = self.conn.lock().await;
        let deleted = conn
            .execute(
                "DELETE FROM chat_user_conn_stats WHERE id = ?1",
                params![id.as_str()],
            )
            .map_err(storage_error)?;
        Ok(deleted > 0)
    }

    async fn find(&self, id: &ConnectionId) -> Result<Option<ConnectionStat>, RepositoryError> {
        let conn = self.conn.lock().await;
        let row = conn
            .query_row(
                "SELECT id, user_name, room_id FROM chat_user_conn_stats WHERE id = ?1",
                params![id.as_str()],
                ConnectionStatRow::from_row,
            )
            .optional()
            .map_err(storage_error)?;

        row.map(ConnectionStatRow::into_stat).transpose()
    }

    async fn list_all(&self) -> Result<Vec<ConnectionStat>, RepositoryError> {
        let conn = self.conn.lock().await;
        let mut stmt = conn
            .prepare("SELECT id, user_name, room_id FROM chat_user_conn_stats ORDER BY id")
            .map_err(storage_error)?;
        let rows = stmt
            .query_map([], ConnectionStatRow::from_row)
            .map_err(storage_error)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(storage_error)?;

        rows.into_iter().map(ConnectionStatRow::into_stat).collect()
    }
}
