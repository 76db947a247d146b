//! UseCase: ログイン
//!
//! 資格情報を検証し、成功したら SessionStore で新しいセッションを作成します。
//! 署名やストレージの失敗は呼び出し側へエラーとして返します。

use std::sync::Arc;

use crate::domain::{Session, UserRepository, Username};

use super::{error::LoginError, session_store::SessionStore};

pub struct LoginUseCase {
    users: Arc<dyn UserRepository>,
    sessions: Arc<SessionStore>,
}

impl LoginUseCase {
    pub fn new(users: Arc<dyn UserRepository>, sessions: Arc<SessionStore>) -> Self {
        Self { users, sessions }
    }

    pub async fn execute(&self, username: &str, password: &str) -> Result<Session, LoginError> {
        let username =
            Username::new(username.to_string()).map_err(|_| LoginError::InvalidCredentials)?;

        let Some(user) = self.users.verify_credentials(&username, password).await? else {
            tracing::warn!("Login failed for '{}'", username);
            return Err(LoginError::InvalidCredentials);
        };

        let session = self.sessions.create(&user.username).await?;
        tracing::info!("User '{}' logged in", user.username);
        Ok(session)
    }
}
