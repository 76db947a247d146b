//! Utilities shared by the Roomcast server and client.

pub mod logger;
pub mod time;
