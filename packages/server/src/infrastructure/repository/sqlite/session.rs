//! SQLite Session Repository 実装

use async_trait::async_trait;
use rusqlite::{OptionalExtension, Row, params};

use super::storage_error;
use crate::{
    domain::{RepositoryError, Session, SessionRepository, SessionToken, Timestamp, Username},
    infrastructure::db::SharedConnection,
};

pub struct SqliteSessionRepository {
    conn: SharedConnection,
}

impl SqliteSessionRepository {
    pub fn new(conn: SharedConnection) -> Self {
        Self { conn }
    }
}

struct SessionRow {
    token: String,
    user_name: String,
    create_at: i64,
    expires: i64,
}

impl SessionRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            token: row.get("token")?,
            user_name: row.get("user_name")?,
            create_at: row.get("create_at")?,
            expires: row.get("expires")?,
        })
    }

    fn into_session(self) -> Result<Session, RepositoryError> {
        Ok(Session::new(
            Username::new(self.user_name)?,
            SessionToken::new(self.token)?,
            Timestamp::new(self.create_at),
            Timestamp::new(self.expires),
        ))
    }
}

#[async_trait]
impl SessionRepository for SqliteSessionRepository {
    async fn replace(&self, session: &Session) -> Result<(), RepositoryError> {
        let mut conn = self.conn.lock().await;
        let tx = conn.transaction().map_err(storage_error)?;

        tx.execute(
            "DELETE FROM chat_user_session WHERE user_name = ?1",
            params![session.username.as_str()],
        )
        .map_err(storage_error)?;
        tx.execute(
            "INSERT INTO chat_user_session (token, user_name, create_at, expires)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                session.token.as_str(),
                session.username.as_str(),
                session.created_at.value(),
                session.expires_at.value(),
            ],
        )
        .map_err(storage_error)?;

        tx.commit().map_err(storage_error)
    }

    async fn find_by_token(
        &self,
        token: &SessionToken,
    ) -> Result<Option<Session>, RepositoryError> {
        let conn = self.conn.lock().await;
        let row = conn
            .query_row(
                "SELECT token, user_name, create_at, expires
                 FROM chat_user_session WHERE token = ?1",
                params![token.as_str()],
                SessionRow::from_row,
            )
            .optional()
            .map_err(storage_error)?;

        row.map(SessionRow::into_session).transpose()
    }

    async fn find_by_username(
        &self,
        username: &Username,
    ) -> Result<Option<Session>, RepositoryError> {
        let conn = self.conn.lock().await;
        let row = conn
            .query_row(
                "SELECT token, user_name, create_at, expires
                 FROM chat_user_session WHERE user_name = ?1",
                params![username.as_str()],
                SessionRow::from_row,
            )
            .optional()
            .map_err(storage_error)?;

        row.map(SessionRow::into_session).transpose()
    }

    async fn delete_expired(&self, now: Timestamp) -> Result<usize, RepositoryError> {
        let conn = self.conn.lock().await;
        conn.execute(
            "DELETE FROM chat_user_session WHERE expires <= ?1",
            params![now.value()],
        )
        .map_err(storage_error)
    }
}
