//! Data Transfer Objects (DTOs) for the relay.
//!
//! DTOs are organized by protocol:
//! - `websocket`: messages relayed over the room connection
//! - `http`: HTTP API request/response bodies

pub mod conversion;
pub mod http;
pub mod websocket;
