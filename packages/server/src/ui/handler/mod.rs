//! HTTP and WebSocket handlers.

mod auth;
mod http;
mod websocket;

pub use auth::{auth_info, login};
pub use http::{get_server_info, health_check, list_rooms, list_servers};
pub use websocket::connect_handler;
