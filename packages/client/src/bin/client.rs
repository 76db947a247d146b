//! Interactive chat client for the Roomcast relay.
//!
//! Logs in over HTTP, joins a room over WebSocket, sends every line typed on
//! stdin and prints the messages relayed from the other members.
//! Lost connections are retried (max 5 attempts with 5 second interval).
//!
//! Run with:
//! ```not_rust
//! cargo run --bin roomcast-client -- --username admin --password admin
//! cargo run --bin roomcast-client -- -u alice -P secret -r 2 -s http://127.0.0.1:3000
//! ```

use clap::Parser;
use roomcast_client::{ClientConfig, run_client};
use roomcast_shared::logger::{LogFormat, setup_logger};

#[derive(Parser, Debug)]
#[command(name = "roomcast-client")]
#[command(about = "Interactive chat client for the Roomcast relay", long_about = None)]
struct Args {
    /// Username to log in with
    #[arg(short = 'u', long)]
    username: String,

    /// Password to log in with
    #[arg(short = 'P', long, env = "ROOMCAST_PASSWORD")]
    password: String,

    /// Room ID to join
    #[arg(short = 'r', long, default_value = "1")]
    room: String,

    /// HTTP base URL of the relay server
    #[arg(short = 's', long, default_value = "http://127.0.0.1:8080")]
    server: String,
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    setup_logger(&["roomcast_client"], "info", LogFormat::Pretty);

    let args = Args::parse();
    let config = ClientConfig {
        server_url: args.server,
        username: args.username,
        password: args.password,
        room: args.room,
    };

    if let Err(e) = run_client(config).await {
        tracing::error!("Client error: {}", e);
        std::process::exit(1);
    }
}
