//! ドメインサービスの trait 定義
//!
//! - `TokenIssuer`: セッショントークンの発行・検証
//! - `MessageHandler`: 読み込みループが受け取ったフレームの処理

use async_trait::async_trait;

use super::{Connection, SessionToken, Timestamp, TokenError, Username};

/// セッショントークンの発行・検証
///
/// トークンは署名付きだが、有効期限の判定はセッションレコードが正とする。
#[cfg_attr(test, mockall::automock)]
pub trait TokenIssuer: Send + Sync {
    /// `username` 向けに一意なトークンを発行する
    fn issue(
        &self,
        username: &Username,
        issued_at: Timestamp,
        expires_at: Timestamp,
    ) -> Result<SessionToken, TokenError>;

    /// 署名を検証し、トークンの主体を返す
    fn verify(&self, token: &str) -> Result<Username, TokenError>;
}

/// 受信フレームの処理（BroadcastHub が実装する）
#[async_trait]
pub trait MessageHandler: Send + Sync {
    async fn handle(&self, connection: &Connection, frame: &[u8]);
}
