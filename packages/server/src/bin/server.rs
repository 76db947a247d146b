//! Room-based WebSocket relay server.
//!
//! Clients log in over HTTP, then join a room on `/ws/connect` and have
//! their messages relayed to everyone else in the same room.
//!
//! Run with:
//! ```not_rust
//! cargo run --bin roomcast-server
//! cargo run --bin roomcast-server -- --host 0.0.0.0 --port 3000 --database ./data/roomcast.db
//! ```

use clap::Parser;
use roomcast_server::{bootstrap::Application, config::ServerConfig, ui::signal::shutdown_signal};
use roomcast_shared::logger::setup_logger;

#[derive(Parser, Debug)]
#[command(name = "roomcast-server")]
#[command(about = "Room-based WebSocket messaging relay", long_about = None)]
struct Args {
    /// Host address to bind the server to (overrides ROOMCAST_HOST)
    #[arg(short = 'H', long)]
    host: Option<String>,

    /// Port number to bind the server to (overrides ROOMCAST_PORT)
    #[arg(short = 'p', long)]
    port: Option<u16>,

    /// SQLite database path, or ":memory:" (overrides ROOMCAST_DATABASE_PATH)
    #[arg(short = 'd', long)]
    database: Option<String>,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    let mut config = ServerConfig::from_env();
    if let Some(host) = args.host {
        config.host = host;
    }
    if let Some(port) = args.port {
        config.port = port;
    }
    if let Some(database) = args.database {
        config.database_path = database;
    }

    // Initialize tracing
    setup_logger(
        &["roomcast_server", "tower_http"],
        &config.log_level,
        config.log_format,
    );

    if let Err(e) = run(config).await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}

async fn run(config: ServerConfig) -> Result<(), Box<dyn std::error::Error>> {
    let app = Application::build(&config).await?;
    let listener = tokio::net::TcpListener::bind(config.bind_addr()).await?;
    app.serve(listener, shutdown_signal()).await?;
    Ok(())
}
