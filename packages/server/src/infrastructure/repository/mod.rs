//! Repository 実装

pub mod sqlite;

pub use sqlite::{
    SqliteConnectionStatRepository, SqliteDirectoryRepository, SqliteSessionRepository,
    SqliteUserRepository,
};
