//! SQLite User Repository 実装（資格情報ストア）

use async_trait::async_trait;
use rusqlite::{OptionalExtension, params};

use super::storage_error;
use crate::{
    domain::{ChatUser, RepositoryError, UserRepository, Username},
    infrastructure::{db::SharedConnection, password::verify_password},
};

pub struct SqliteUserRepository {
    conn: SharedConnection,
}

impl SqliteUserRepository {
    pub fn new(conn: SharedConnection) -> Self {
        Self { conn }
    }

    async fn find_with_hash(
        &self,
        username: &Username,
    ) -> Result<Option<(ChatUser, String)>, RepositoryError> {
        let conn = self.conn.lock().await;
        let row = conn
            .query_row(
                "SELECT id, name, user_name, password FROM chat_user WHERE user_name = ?1",
                params![username.as_str()],
                |row| {
                    Ok((
                        row.get::<_, i64>("id")?,
                        row.get::<_, String>("name")?,
                        row.get::<_, String>("user_name")?,
                        row.get::<_, String>("password")?,
                    ))
                },
            )
            .optional()
            .map_err(storage_error)?;

        row.map(|(id, name, user_name, password)| {
            let user = ChatUser {
                id,
                name,
                username: Username::new(user_name)?,
            };
            Ok::<_, RepositoryError>((user, password))
        })
        .transpose()
    }
}

#[async_trait]
impl UserRepository for SqliteUserRepository {
    async fn find_by_username(
        &self,
        username: &Username,
    ) -> Result<Option<ChatUser>, RepositoryError> {
        Ok(self.find_with_hash(username).await?.map(|(user, _)| user))
    }

    async fn verify_credentials(
        &self,
        username: &Username,
        password: &str,
    ) -> Result<Option<ChatUser>, RepositoryError> {
        let Some((user, stored_hash)) = self.find_with_hash(username).await? else {
            return Ok(None);
        };

        let matched = verify_password(password, &stored_hash)
            .map_err(|e| RepositoryError::CorruptedRecord(e.to_string()))?;

        Ok(matched.then_some(user))
    }
}
