//! HTTP / WebSocket interface of the relay.

mod error;
mod handler;
mod identity;
mod middleware;
mod server;
pub mod signal;
pub mod state;

pub use error::ApiError;
pub use identity::AuthenticatedUser;
pub use server::Server;
pub use state::AppState;
