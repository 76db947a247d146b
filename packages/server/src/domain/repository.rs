//! Repository trait 定義
//!
//! ドメイン層が必要とするデータアクセスのインターフェースを定義します。
//! 具体的な実装は Infrastructure 層が提供します（依存性の逆転）。
//!
//! 書き込みの競合はストレージ側のトランザクションと一意制約で直列化し、
//! プロセス内のロックには頼りません。

use async_trait::async_trait;

use super::{
    ChatRoom, ChatServer, ChatUser, ConnectionId, ConnectionStat, RepositoryError, RoomId,
    ServerId, Session, SessionToken, Timestamp, Username,
};

/// Session Repository trait
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SessionRepository: Send + Sync {
    /// 同じ Identity の既存セッションを削除してから新しいセッションを保存する
    ///
    /// 削除と挿入は 1 トランザクションで行われる。
    async fn replace(&self, session: &Session) -> Result<(), RepositoryError>;

    /// トークンでセッションを検索（期限切れかどうかは判定しない）
    async fn find_by_token(&self, token: &SessionToken)
    -> Result<Option<Session>, RepositoryError>;

    /// Identity でセッションを検索
    async fn find_by_username(
        &self,
        username: &Username,
    ) -> Result<Option<Session>, RepositoryError>;

    /// `now` 時点で期限切れのセッションをすべて削除し、削除件数を返す
    async fn delete_expired(&self, now: Timestamp) -> Result<usize, RepositoryError>;
}

/// ConnectionStat Repository trait
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ConnectionStatRepository: Send + Sync {
    /// 同じ (username, room_id) の既存レコードを削除し、`stat` を挿入する
    ///
    /// 検索・削除・挿入は 1 トランザクション。削除したレコードを返す。
    async fn acquire(&self, stat: &ConnectionStat)
    -> Result<Vec<ConnectionStat>, RepositoryError>;

    /// ID でレコードを削除する。削除した場合は `true`、存在しなかった場合は `false`
    async fn release(&self, id: &ConnectionId) -> Result<bool, RepositoryError>;

    /// ID でレコードを検索
    async fn find(&self, id: &ConnectionId) -> Result<Option<ConnectionStat>, RepositoryError>;

    /// 全レコードを取得（起動時の突き合わせ用）
    async fn list_all(&self) -> Result<Vec<ConnectionStat>, RepositoryError>;
}

/// User Repository trait（資格情報ストア）
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// ユーザー名でユーザーを検索
    async fn find_by_username(
        &self,
        username: &Username,
    ) -> Result<Option<ChatUser>, RepositoryError>;

    /// パスワードを検証し、一致した場合のみユーザーを返す
    async fn verify_credentials(
        &self,
        username: &Username,
        password: &str,
    ) -> Result<Option<ChatUser>, RepositoryError>;
}

/// Directory Repository trait（サーバー・ルームの参照）
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DirectoryRepository: Send + Sync {
    async fn list_servers(&self) -> Result<Vec<ChatServer>, RepositoryError>;

    async fn find_server(&self, id: ServerId) -> Result<Option<ChatServer>, RepositoryError>;

    async fn list_rooms(&self, server_id: ServerId) -> Result<Vec<ChatRoom>, RepositoryError>;

    async fn find_room(&self, id: RoomId) -> Result<Option<ChatRoom>, RepositoryError>;
}
