//! UseCase 層のエラー型

use thiserror::Error;

use crate::domain::{ConnectionId, RepositoryError, RoomId, ServerId, TokenError};

/// SessionStore のエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionStoreError {
    #[error("failed to issue session token: {0}")]
    Token(#[from] TokenError),

    #[error(transparent)]
    Storage(#[from] RepositoryError),
}

/// 認証（トークン → Identity）のエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("token is missing")]
    MissingToken,

    #[error("token is not valid")]
    InvalidToken,

    #[error("session not found")]
    SessionNotFound,

    #[error("session has expired")]
    SessionExpired,

    #[error("user '{0}' not found")]
    UserNotFound(String),

    #[error(transparent)]
    Storage(#[from] RepositoryError),
}

impl AuthError {
    /// ストレージ障害ではなく「認証されていない」ことを表すか
    pub fn is_unauthorized(&self) -> bool {
        !matches!(self, AuthError::Storage(_))
    }
}

/// ログインのエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoginError {
    #[error("invalid username or password")]
    InvalidCredentials,

    #[error(transparent)]
    Session(#[from] SessionStoreError),

    #[error(transparent)]
    Storage(#[from] RepositoryError),
}

/// 接続確立のエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConnectError {
    #[error("unauthorized: {0}")]
    Unauthorized(AuthError),

    #[error("room {0} not found")]
    RoomNotFound(RoomId),

    #[error(transparent)]
    Storage(#[from] RepositoryError),

    /// ハンドシェイク中に同じ (ユーザー, ルーム) の新しい接続に横取りされた
    #[error("connection '{0}' was superseded before registration")]
    Superseded(ConnectionId),
}

impl From<AuthError> for ConnectError {
    fn from(error: AuthError) -> Self {
        match error {
            AuthError::Storage(e) => ConnectError::Storage(e),
            other => ConnectError::Unauthorized(other),
        }
    }
}

/// サーバー・ルーム参照のエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DirectoryError {
    #[error("server {0} not found")]
    ServerNotFound(ServerId),

    #[error(transparent)]
    Storage(#[from] RepositoryError),
}
