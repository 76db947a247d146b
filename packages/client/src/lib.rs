//! Interactive command-line client for the Roomcast relay.

pub mod api;
mod domain;
pub mod error;
mod formatter;
mod runner;
mod session;
mod ui;

pub use error::ClientError;
pub use runner::{ClientConfig, run_client};
