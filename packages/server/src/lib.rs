//! Roomcast relay server.
//!
//! Authenticated clients join a room over WebSocket and every frame they send
//! is relayed to the other members of that room.

pub mod bootstrap;
pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod ui;
pub mod usecase;
