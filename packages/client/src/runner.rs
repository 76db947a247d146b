//! Client execution logic with reconnection support.

use std::time::Duration;

use crate::{
    api::ApiClient,
    domain::{should_attempt_reconnect, websocket_url},
    error::ClientError,
    session::run_client_session,
};

const MAX_RECONNECT_ATTEMPTS: u32 = 5;
const RECONNECT_INTERVAL_SECS: u64 = 5;

/// Connection settings for one client run
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// HTTP base URL of the relay, e.g. `http://127.0.0.1:8080`
    pub server_url: String,
    pub username: String,
    pub password: String,
    pub room: String,
}

/// Log in, join the room and keep the session alive with bounded reconnects.
///
/// Each attempt logs in again, so a token invalidated by another login is
/// replaced transparently.
pub async fn run_client(config: ClientConfig) -> Result<(), ClientError> {
    let api = ApiClient::new(config.server_url.clone());
    let mut reconnect_count = 0;

    loop {
        tracing::info!(
            "Attempting to connect to {} as '{}' (attempt {}/{})",
            config.server_url,
            config.username,
            reconnect_count + 1,
            MAX_RECONNECT_ATTEMPTS
        );

        let result = match api.login(&config.username, &config.password).await {
            Ok(login) => {
                tracing::debug!("Session expires at {}", login.expires_at);
                let url = websocket_url(&config.server_url, &config.room, &login.token)?;
                run_client_session(&url, &config.room, &config.username).await
            }
            Err(e) => Err(e),
        };

        match result {
            Ok(()) => {
                tracing::info!("Client session ended normally");
                return Ok(());
            }
            Err(e) => {
                tracing::warn!("Session ended: {}", e);
                reconnect_count += 1;

                if !should_attempt_reconnect(&e, reconnect_count, MAX_RECONNECT_ATTEMPTS) {
                    return Err(e);
                }

                tracing::info!(
                    "Reconnecting in {} seconds... (attempt {}/{})",
                    RECONNECT_INTERVAL_SECS,
                    reconnect_count + 1,
                    MAX_RECONNECT_ATTEMPTS
                );
                tokio::time::sleep(Duration::from_secs(RECONNECT_INTERVAL_SECS)).await;
            }
        }
    }
}
