//! SQLite Repository 実装
//!
//! ドメイン層が定義する Repository trait の具体的な実装。
//! すべての Repository は `Database` の共有接続を使います。
//!
//! 「削除してから挿入」のような複合操作は 1 トランザクションで実行し、
//! 一意制約と合わせて同時実行時の整合性を保ちます。

mod connection_stat;
mod directory;
mod session;
mod user;

pub use connection_stat::SqliteConnectionStatRepository;
pub use directory::SqliteDirectoryRepository;
pub use session::SqliteSessionRepository;
pub use user::SqliteUserRepository;

use crate::domain::RepositoryError;

fn storage_error(error: rusqlite::Error) -> RepositoryError {
    RepositoryError::Storage(error.to_string())
}
