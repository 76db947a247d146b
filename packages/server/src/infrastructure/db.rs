//! SQLite データベース
//!
//! ## 責務
//!
//! - データベースファイル（または `:memory:`）を開く
//! - スキーママイグレーションの適用（`schema_migrations` でバージョン管理）
//! - 初回起動時のデフォルトデータ投入（admin ユーザー、Default server / Default room）
//!
//! 接続は `Arc<Mutex<rusqlite::Connection>>` として各 Repository で共有します。

use std::{path::Path, sync::Arc};

use rusqlite::{Connection as SqliteConnection, OptionalExtension, params};
use thiserror::Error;
use tokio::sync::Mutex;

use super::password::{PasswordHashError, hash_password};

/// Repository 間で共有する SQLite 接続
pub type SharedConnection = Arc<Mutex<SqliteConnection>>;

/// インメモリ DB を指定するパス
pub const IN_MEMORY_PATH: &str = ":memory:";

/// 初期ユーザー
pub const DEFAULT_ADMIN_USERNAME: &str = "admin";
const DEFAULT_ADMIN_PASSWORD: &str = "admin";

const MIGRATION_V1_SQL: &str = r#"
CREATE TABLE chat_user (
    id          INTEGER PRIMARY KEY,
    name        TEXT NOT NULL,
    user_name   TEXT NOT NULL UNIQUE,
    password    TEXT NOT NULL
);

CREATE TABLE chat_user_session (
    token       TEXT PRIMARY KEY,
    user_name   TEXT NOT NULL UNIQUE,
    create_at   INTEGER NOT NULL,
    expires     INTEGER NOT NULL
);

CREATE INDEX chat_user_session_expires_idx
    ON chat_user_session (expires);

CREATE TABLE chat_server (
    id          INTEGER PRIMARY KEY,
    name        TEXT NOT NULL,
    description TEXT NOT NULL
);

CREATE TABLE chat_room (
    id          INTEGER PRIMARY KEY,
    name        TEXT NOT NULL,
    description TEXT NOT NULL,
    server_id   INTEGER NOT NULL REFERENCES chat_server (id) ON DELETE RESTRICT
);

CREATE TABLE chat_user_conn_stats (
    id          TEXT PRIMARY KEY,
    user_name   TEXT NOT NULL,
    room_id     INTEGER NOT NULL REFERENCES chat_room (id) ON DELETE RESTRICT
);

CREATE UNIQUE INDEX chat_user_conn_stats_identity_room_idx
    ON chat_user_conn_stats (user_name, room_id);
"#;

const MIGRATIONS: &[(i64, &str)] = &[(1, MIGRATION_V1_SQL)];

/// データベースの初期化エラー
#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("failed to create database directory '{path}': {source}")]
    CreateDir {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to open database at '{path}': {source}")]
    Open {
        path: String,
        #[source]
        source: rusqlite::Error,
    },

    #[error("failed to apply migration v{version}: {source}")]
    Migration {
        version: i64,
        #[source]
        source: rusqlite::Error,
    },

    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("failed to seed default data: {0}")]
    Seed(#[from] PasswordHashError),
}

/// SQLite データベース
#[derive(Debug, Clone)]
pub struct Database {
    conn: SharedConnection,
}

impl Database {
    /// パスを指定してデータベースを開き、マイグレーションを適用する
    ///
    /// `":memory:"` を渡すとインメモリ DB になる。
    pub fn open(path: &str) -> Result<Self, DatabaseError> {
        if path == IN_MEMORY_PATH {
            return Self::open_in_memory();
        }

        if let Some(parent) = Path::new(path).parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|source| DatabaseError::CreateDir {
                path: parent.display().to_string(),
                source,
            })?;
        }

        let conn = SqliteConnection::open(path).map_err(|source| DatabaseError::Open {
            path: path.to_string(),
            source,
        })?;
        conn.execute_batch(
            "
            PRAGMA foreign_keys = ON;
            PRAGMA journal_mode = WAL;
            ",
        )?;

        Self::with_connection(conn)
    }

    /// インメモリ DB を開く（テスト用）
    pub fn open_in_memory() -> Result<Self, DatabaseError> {
        let conn = SqliteConnection::open_in_memory().map_err(|source| DatabaseError::Open {
            path: IN_MEMORY_PATH.to_string(),
            source,
        })?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;

        Self::with_connection(conn)
    }

    fn with_connection(mut conn: SqliteConnection) -> Result<Self, DatabaseError> {
        ensure_migration_table(&conn)?;
        apply_pending_migrations(&mut conn)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Repository に渡す共有接続
    pub fn connection(&self) -> SharedConnection {
        self.conn.clone()
    }

    /// 適用済みのスキーマバージョン
    pub async fn schema_version(&self) -> Result<i64, DatabaseError> {
        let conn = self.conn.lock().await;
        Ok(current_schema_version(&conn)?)
    }

    /// デフォルトデータを投入する（既に存在する場合は何もしない）
    pub async fn seed_defaults(&self) -> Result<(), DatabaseError> {
        let conn = self.conn.lock().await;

        let admin_exists: Option<i64> = conn
            .query_row(
                "SELECT id FROM chat_user WHERE user_name = ?1",
                params![DEFAULT_ADMIN_USERNAME],
                |row| row.get(0),
            )
            .optional()?;
        if admin_exists.is_none() {
            let password_hash = hash_password(DEFAULT_ADMIN_PASSWORD)?;
            conn.execute(
                "INSERT INTO chat_user (id, name, user_name, password) VALUES (1, ?1, ?1, ?2)",
                params![DEFAULT_ADMIN_USERNAME, password_hash],
            )?;
            tracing::info!("Seeded default user '{}'", DEFAULT_ADMIN_USERNAME);
        }

        let inserted_server = conn.execute(
            "INSERT OR IGNORE INTO chat_server (id, name, description)
             VALUES (1, 'Default server', 'Default server')",
            [],
        )?;
        let inserted_room = conn.execute(
            "INSERT OR IGNORE INTO chat_room (id, name, description, server_id)
             VALUES (1, 'Default room', 'Default room', 1)",
            [],
        )?;
        if inserted_server + inserted_room > 0 {
            tracing::info!("Seeded default server and room");
        }

        Ok(())
    }
}

fn ensure_migration_table(conn: &SqliteConnection) -> Result<(), DatabaseError> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS schema_migrations (
            version     INTEGER PRIMARY KEY,
            applied_at  TEXT NOT NULL
        );
        ",
    )?;
    Ok(())
}

fn current_schema_version(conn: &SqliteConnection) -> Result<i64, rusqlite::Error> {
    conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
        [],
        |row| row.get(0),
    )
}

fn apply_pending_migrations(conn: &mut SqliteConnection) -> Result<(), DatabaseError> {
    let current = current_schema_version(conn)?;

    for (version, sql) in MIGRATIONS.iter().filter(|(version, _)| *version > current) {
        let tx = conn.transaction()?;
        tx.execute_batch(sql)
            .map_err(|source| DatabaseError::Migration {
                version: *version,
                source,
            })?;
        tx.execute(
            "INSERT INTO schema_migrations (version, applied_at) VALUES (?1, datetime('now'))",
            params![version],
        )?;
        tx.commit()?;
        tracing::info!("Applied schema migration v{}", version);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_open_in_memory_applies_migrations() {
        // テスト項目: インメモリ DB を開くと最新のスキーマが適用される
        // given (前提条件):
        let db = Database::open_in_memory().unwrap();

        // when (操作):
        let version = db.schema_version().await.unwrap();

        // then (期待する結果):
        assert_eq!(version, 1);
    }

    #[tokio::test]
    async fn test_seed_defaults_is_idempotent() {
        // テスト項目: デフォルトデータの投入は何度実行しても重複しない
        // given (前提条件):
        let db = Database::open_in_memory().unwrap();

        // when (操作):
        db.seed_defaults().await.unwrap();
        db.seed_defaults().await.unwrap();

        // then (期待する結果):
        let conn = db.connection();
        let conn = conn.lock().await;
        let users: i64 = conn
            .query_row("SELECT COUNT(*) FROM chat_user", [], |row| row.get(0))
            .unwrap();
        let rooms: i64 = conn
            .query_row("SELECT COUNT(*) FROM chat_room", [], |row| row.get(0))
            .unwrap();
        assert_eq!(users, 1);
        assert_eq!(rooms, 1);
    }

    #[tokio::test]
    async fn test_conn_stats_identity_room_is_unique() {
        // テスト項目: 同じ (user_name, room_id) のレコードは DB レベルで 2 件入らない
        // given (前提条件):
        let db = Database::open_in_memory().unwrap();
        db.seed_defaults().await.unwrap();
        let conn = db.connection();
        let conn = conn.lock().await;
        conn.execute(
            "INSERT INTO chat_user_conn_stats (id, user_name, room_id) VALUES ('a', 'admin', 1)",
            [],
        )
        .unwrap();

        // when (操作):
        let result = conn.execute(
            "INSERT INTO chat_user_conn_stats (id, user_name, room_id) VALUES ('b', 'admin', 1)",
            [],
        );

        // then (期待する結果):
        assert!(result.is_err());
    }
}
