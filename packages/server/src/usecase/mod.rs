//! UseCase 層
//!
//! セッション管理、接続の記録と横取り、接続ライフサイクル、ブロードキャスト、
//! およびログイン・認証・ディレクトリ参照のユースケース。

pub mod authenticate;
pub mod broadcast;
pub mod connection_stat;
pub mod directory;
pub mod error;
pub mod lifecycle;
pub mod login;
pub mod session_store;

pub use authenticate::AuthenticateUseCase;
pub use broadcast::BroadcastHub;
pub use connection_stat::ConnectionStatRecorder;
pub use directory::{GetServerInfoUseCase, ListRoomsUseCase, ListServersUseCase};
pub use error::{AuthError, ConnectError, DirectoryError, LoginError, SessionStoreError};
pub use lifecycle::{ConnectionLifecycle, PendingConnection};
pub use login::LoginUseCase;
pub use session_store::{
    DEFAULT_SESSION_TTL, DEFAULT_SWEEP_INTERVAL, SessionStore, SweepHandle,
};
