//! ドメイン層
//!
//! 値オブジェクト・エンティティ・接続ハンドル、および
//! 外側の層が実装すべきインターフェース（Repository, TokenIssuer, MessageHandler）。

pub mod connection;
pub mod entity;
pub mod error;
pub mod repository;
pub mod service;
pub mod value_object;

pub use connection::{
    Connection, ConnectionState, InboundFrame, OutboundChannel, OutboundFrame,
};
pub use entity::{ChatRoom, ChatServer, ChatUser, ConnectionStat, Session};
pub use error::{PushError, RepositoryError, TokenError, ValueObjectError};
pub use repository::{
    ConnectionStatRepository, DirectoryRepository, SessionRepository, UserRepository,
};
pub use service::{MessageHandler, TokenIssuer};
pub use value_object::{ConnectionId, RoomId, ServerId, SessionToken, Timestamp, Username};

#[cfg(test)]
pub use repository::{
    MockConnectionStatRepository, MockDirectoryRepository, MockSessionRepository,
    MockUserRepository,
};
#[cfg(test)]
pub use service::MockTokenIssuer;
