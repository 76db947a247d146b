//! ドメイン層のエラー型

use thiserror::Error;

/// 値オブジェクトの検証エラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValueObjectError {
    #[error("username must not be empty")]
    EmptyUsername,

    #[error("username is too long ({0} characters)")]
    UsernameTooLong(usize),

    #[error("invalid room id: '{0}'")]
    InvalidRoomId(String),

    #[error("invalid server id: '{0}'")]
    InvalidServerId(String),

    #[error("connection id must not be empty")]
    EmptyConnectionId,

    #[error("session token must not be empty")]
    EmptyToken,
}

/// 永続化層（Repository）のエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RepositoryError {
    /// ストレージへの読み書きに失敗した
    #[error("storage error: {0}")]
    Storage(String),

    /// 保存されていた値がドメインの制約を満たさない
    #[error("corrupted record: {0}")]
    CorruptedRecord(String),
}

impl From<ValueObjectError> for RepositoryError {
    fn from(error: ValueObjectError) -> Self {
        Self::CorruptedRecord(error.to_string())
    }
}

/// セッショントークンの発行・検証エラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenError {
    #[error("failed to sign token: {0}")]
    Signing(String),

    #[error("invalid token: {0}")]
    Invalid(String),
}

/// Connection への送信エラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PushError {
    /// すでに Closing / Closed 状態
    #[error("connection '{0}' is closed")]
    ConnectionClosed(String),

    /// 書き込みタスクが終了しており、チャンネルが閉じている
    #[error("outbound channel of connection '{0}' is gone")]
    ChannelClosed(String),
}
