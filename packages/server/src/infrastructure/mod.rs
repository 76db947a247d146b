//! Infrastructure 層
//!
//! ドメイン層の trait（Repository, TokenIssuer）の具体的な実装と、
//! メモリ上の RoomRegistry、ワイヤーフォーマット（DTO）を提供します。

pub mod db;
pub mod dto;
pub mod password;
pub mod registry;
pub mod repository;
pub mod token;

pub use db::{Database, DatabaseError, SharedConnection};
pub use registry::RoomRegistry;
pub use token::JwtTokenIssuer;
