//! 値オブジェクト
//!
//! 生の文字列・整数をそのまま引き回さず、検証済みの型としてドメイン層に持ち込みます。

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::error::ValueObjectError;

/// ユーザー名の最大長（chat_user.user_name の列幅に合わせる）
pub const MAX_USERNAME_LENGTH: usize = 255;

/// 認証済みの主体を表すユーザー名（Identity）
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Username(String);

impl Username {
    /// 新しい Username を作成
    ///
    /// 前後の空白は取り除かれ、空文字列と長すぎる値は拒否されます。
    pub fn new(value: String) -> Result<Self, ValueObjectError> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(ValueObjectError::EmptyUsername);
        }
        let length = trimmed.chars().count();
        if length > MAX_USERNAME_LENGTH {
            return Err(ValueObjectError::UsernameTooLong(length));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl TryFrom<String> for Username {
    type Error = ValueObjectError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl fmt::Display for Username {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// チャットルーム ID
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RoomId(i64);

impl RoomId {
    pub fn new(value: i64) -> Self {
        Self(value)
    }

    /// クエリパラメータなどの文字列から RoomId を解析
    pub fn parse(value: &str) -> Result<Self, ValueObjectError> {
        value
            .trim()
            .parse::<i64>()
            .map(Self)
            .map_err(|_| ValueObjectError::InvalidRoomId(value.to_string()))
    }

    pub fn value(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// チャットサーバー ID（ルームをまとめる単位）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ServerId(i64);

impl ServerId {
    pub fn new(value: i64) -> Self {
        Self(value)
    }

    pub fn parse(value: &str) -> Result<Self, ValueObjectError> {
        value
            .trim()
            .parse::<i64>()
            .map(Self)
            .map_err(|_| ValueObjectError::InvalidServerId(value.to_string()))
    }

    pub fn value(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for ServerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 接続 ID
///
/// ConnectionStat（永続レコード）と Connection（メモリ上のハンドル）で共有されます。
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConnectionId(String);

impl ConnectionId {
    /// ランダムな UUID v4 から新しい ConnectionId を生成
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// 既存の ID（DB から読み出した値など）から ConnectionId を作成
    pub fn new(value: String) -> Result<Self, ValueObjectError> {
        if value.trim().is_empty() {
            return Err(ValueObjectError::EmptyConnectionId);
        }
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// セッショントークン（クライアントからは不透明な文字列）
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionToken(String);

impl SessionToken {
    pub fn new(value: String) -> Result<Self, ValueObjectError> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(ValueObjectError::EmptyToken);
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

// トークンをログに出さない
impl fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SessionToken(***)")
    }
}

/// Unix タイムスタンプ（ミリ秒）
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp(i64);

impl Timestamp {
    pub fn new(value: i64) -> Self {
        Self(value)
    }

    pub fn value(&self) -> i64 {
        self.0
    }

    /// `millis` ミリ秒後のタイムスタンプ
    pub fn plus_millis(&self, millis: i64) -> Self {
        Self(self.0.saturating_add(millis))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_username_trims_whitespace() {
        // テスト項目: Username は前後の空白を取り除いて保持する
        // given (前提条件):
        let raw = "  admin ".to_string();

        // when (操作):
        let username = Username::new(raw).unwrap();

        // then (期待する結果):
        assert_eq!(username.as_str(), "admin");
    }

    #[test]
    fn test_username_rejects_empty() {
        // テスト項目: 空白のみの Username は作成できない
        // given (前提条件):
        let raw = "   ".to_string();

        // when (操作):
        let result = Username::new(raw);

        // then (期待する結果):
        assert_eq!(result, Err(ValueObjectError::EmptyUsername));
    }

    #[test]
    fn test_username_rejects_too_long() {
        // テスト項目: 最大長を超える Username は作成できない
        // given (前提条件):
        let raw = "a".repeat(MAX_USERNAME_LENGTH + 1);

        // when (操作):
        let result = Username::new(raw);

        // then (期待する結果):
        assert_eq!(
            result,
            Err(ValueObjectError::UsernameTooLong(MAX_USERNAME_LENGTH + 1))
        );
    }

    #[test]
    fn test_room_id_parse() {
        // テスト項目: 数値文字列は RoomId に変換でき、それ以外はエラーになる
        // given (前提条件):

        // when (操作):
        let valid = RoomId::parse("42");
        let invalid = RoomId::parse("lobby");

        // then (期待する結果):
        assert_eq!(valid, Ok(RoomId::new(42)));
        assert_eq!(
            invalid,
            Err(ValueObjectError::InvalidRoomId("lobby".to_string()))
        );
    }

    #[test]
    fn test_connection_id_generate_is_unique() {
        // テスト項目: 生成される ConnectionId は毎回異なる
        // given (前提条件):

        // when (操作):
        let first = ConnectionId::generate();
        let second = ConnectionId::generate();

        // then (期待する結果):
        assert_ne!(first, second);
    }

    #[test]
    fn test_session_token_debug_is_redacted() {
        // テスト項目: SessionToken の Debug 出力にトークン本体が含まれない
        // given (前提条件):
        let token = SessionToken::new("secret-token".to_string()).unwrap();

        // when (操作):
        let debug = format!("{:?}", token);

        // then (期待する結果):
        assert!(!debug.contains("secret-token"));
    }
}
