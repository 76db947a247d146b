//! UseCase: 認証（トークン → Identity の解決）
//!
//! トークンは「署名が正しい」かつ「期限内のセッションレコードが存在する」場合のみ有効です。
//! ValidateToken / GetAuthInfo、および接続確立時の Identity 解決に使われます。

use std::sync::Arc;

use crate::domain::{SessionToken, UserRepository, Username};

use super::{error::AuthError, session_store::SessionStore};

pub struct AuthenticateUseCase {
    sessions: Arc<SessionStore>,
    users: Arc<dyn UserRepository>,
}

impl AuthenticateUseCase {
    pub fn new(sessions: Arc<SessionStore>, users: Arc<dyn UserRepository>) -> Self {
        Self { sessions, users }
    }

    /// トークンから有効な Identity を解決する
    pub async fn execute(&self, token: Option<&str>) -> Result<Username, AuthError> {
        let token = token
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(AuthError::MissingToken)?;

        let subject = self.sessions.verify_signature(token).map_err(|e| {
            tracing::debug!("Rejected token: {}", e);
            AuthError::InvalidToken
        })?;
        let token = SessionToken::new(token.to_string()).map_err(|_| AuthError::InvalidToken)?;

        let session = self
            .sessions
            .resolve(&token)
            .await?
            .ok_or(AuthError::SessionNotFound)?;

        if session.username != subject {
            tracing::warn!(
                "Token subject '{}' does not match session owner '{}'",
                subject,
                session.username
            );
            return Err(AuthError::InvalidToken);
        }
        if self.sessions.is_expired(&session) {
            return Err(AuthError::SessionExpired);
        }

        Ok(session.username)
    }

    /// トークンが有効かどうか
    pub async fn validate_token(&self, token: &str) -> bool {
        match self.execute(Some(token)).await {
            Ok(_) => true,
            Err(AuthError::Storage(e)) => {
                tracing::error!("Failed to validate token: {}", e);
                false
            }
            Err(_) => false,
        }
    }

    /// トークンの持ち主を返す（ユーザーが存在することも確認する）
    pub async fn get_auth_info(&self, token: &str) -> Result<Username, AuthError> {
        let username = self.execute(Some(token)).await?;
        let user = self
            .users
            .find_by_username(&username)
            .await?
            .ok_or_else(|| AuthError::UserNotFound(username.to_string()))?;
        Ok(user.username)
    }
}
