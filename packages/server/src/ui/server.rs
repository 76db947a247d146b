//! Server execution logic.

use std::{future::Future, sync::Arc};

use axum::{
    Router, middleware,
    routing::{get, post},
};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use super::{
    handler::{
        auth_info, connect_handler, get_server_info, health_check, list_rooms, list_servers,
        login,
    },
    middleware::require_session,
    state::AppState,
};

/// HTTP / WebSocket relay server
///
/// # Example
///
/// ```ignore
/// let server = Server::new(app_state);
/// let listener = tokio::net::TcpListener::bind("127.0.0.1:8080").await?;
/// server.serve(listener, shutdown_signal()).await?;
/// ```
pub struct Server {
    state: Arc<AppState>,
}

impl Server {
    pub fn new(state: Arc<AppState>) -> Self {
        Self { state }
    }

    /// Build the router.
    ///
    /// `/api/server/*` and `/api/auth/info` require a valid session.
    pub fn router(&self) -> Router {
        let protected = Router::new()
            .route("/api/server/list", get(list_servers))
            .route("/api/server/info/{id}", get(get_server_info))
            .route("/api/server/room", get(list_rooms))
            .route("/api/auth/info", get(auth_info))
            .route_layer(middleware::from_fn_with_state(
                self.state.clone(),
                require_session,
            ));

        Router::new()
            // WebSocket エンドポイント
            .route("/ws/connect", get(connect_handler))
            // HTTP エンドポイント
            .route("/api/auth/login", post(login))
            .route("/api/health", get(health_check))
            .merge(protected)
            .layer(TraceLayer::new_for_http())
            .with_state(self.state.clone())
    }

    /// Serve on an already bound listener until `shutdown` resolves.
    pub async fn serve<F>(self, listener: TcpListener, shutdown: F) -> std::io::Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let app = self.router();
        let addr = listener.local_addr()?;

        tracing::info!("Relay server listening on {}", addr);
        tracing::info!("Connect to: ws://{}/ws/connect?room=<id>&token=<token>", addr);

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .await?;

        tracing::info!("Server shutdown complete");
        Ok(())
    }
}
