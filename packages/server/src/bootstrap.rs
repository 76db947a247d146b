//! Application assembly.
//!
//! Wires the SQLite repositories, the session store, the connection registry
//! and the use cases into an [`AppState`], and runs the server with the
//! background expiry sweep.

use std::{sync::Arc, time::Duration};

use roomcast_shared::time::{Clock, SystemClock};
use thiserror::Error;
use tokio::net::TcpListener;

use crate::{
    config::ServerConfig,
    domain::{
        ConnectionStatRepository, DirectoryRepository, MessageHandler, RepositoryError,
        SessionRepository, UserRepository,
    },
    infrastructure::{
        Database, DatabaseError, JwtTokenIssuer, RoomRegistry,
        repository::{
            SqliteConnectionStatRepository, SqliteDirectoryRepository, SqliteSessionRepository,
            SqliteUserRepository,
        },
        token::WeakSecretError,
    },
    ui::{AppState, Server},
    usecase::{
        AuthenticateUseCase, BroadcastHub, ConnectionLifecycle, ConnectionStatRecorder,
        GetServerInfoUseCase, ListRoomsUseCase, ListServersUseCase, LoginUseCase, SessionStore,
    },
};

/// Upper bound for open connections to finish their teardown on shutdown.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(2);
const DRAIN_POLL_INTERVAL: Duration = Duration::from_millis(20);

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Database(#[from] DatabaseError),

    #[error(transparent)]
    WeakSecret(#[from] WeakSecretError),

    #[error("failed to reconcile connection records: {0}")]
    Storage(#[from] RepositoryError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Fully wired relay application.
pub struct Application {
    state: Arc<AppState>,
    sessions: Arc<SessionStore>,
    registry: Arc<RoomRegistry>,
    sweep_interval: Duration,
}

impl Application {
    /// Open the database, seed defaults and assemble every component.
    ///
    /// Connection records left over from a previous process are released
    /// before the application is returned.
    pub async fn build(config: &ServerConfig) -> Result<Self, BootstrapError> {
        if config.is_dev_jwt_secret() {
            tracing::warn!("Using the development JWT secret; set ROOMCAST_JWT_SECRET in production");
        }

        let database = Database::open(&config.database_path)?;
        database.seed_defaults().await?;
        let conn = database.connection();

        let session_repository: Arc<dyn SessionRepository> =
            Arc::new(SqliteSessionRepository::new(conn.clone()));
        let stat_repository: Arc<dyn ConnectionStatRepository> =
            Arc::new(SqliteConnectionStatRepository::new(conn.clone()));
        let user_repository: Arc<dyn UserRepository> =
            Arc::new(SqliteUserRepository::new(conn.clone()));
        let directory_repository: Arc<dyn DirectoryRepository> =
            Arc::new(SqliteDirectoryRepository::new(conn));

        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let token_issuer = Arc::new(JwtTokenIssuer::new(&config.jwt_secret)?);
        let sessions = Arc::new(SessionStore::new(
            session_repository,
            token_issuer,
            clock.clone(),
            config.session_ttl,
        ));

        let registry = Arc::new(RoomRegistry::new());
        let recorder = Arc::new(ConnectionStatRecorder::new(stat_repository, registry.clone()));
        let hub: Arc<dyn MessageHandler> =
            Arc::new(BroadcastHub::new(registry.clone(), clock.clone()));

        let authenticate_usecase = Arc::new(AuthenticateUseCase::new(
            sessions.clone(),
            user_repository.clone(),
        ));
        let connection_lifecycle = Arc::new(ConnectionLifecycle::new(
            authenticate_usecase.clone(),
            directory_repository.clone(),
            recorder.clone(),
            registry.clone(),
            hub,
            clock,
        ));

        let state = Arc::new(AppState {
            login_usecase: Arc::new(LoginUseCase::new(user_repository, sessions.clone())),
            authenticate_usecase,
            connection_lifecycle,
            list_servers_usecase: Arc::new(ListServersUseCase::new(directory_repository.clone())),
            get_server_info_usecase: Arc::new(GetServerInfoUseCase::new(
                directory_repository.clone(),
            )),
            list_rooms_usecase: Arc::new(ListRoomsUseCase::new(directory_repository)),
        });

        let released = recorder.reconcile().await?;
        if released > 0 {
            tracing::info!("Released {} stale connection record(s)", released);
        }

        Ok(Self {
            state,
            sessions,
            registry,
            sweep_interval: config.sweep_interval,
        })
    }

    pub fn state(&self) -> Arc<AppState> {
        self.state.clone()
    }

    pub fn router(&self) -> axum::Router {
        Server::new(self.state.clone()).router()
    }

    /// Serve until `shutdown` resolves, then close every live connection
    /// and stop the expiry sweep.
    pub async fn serve<F>(self, listener: TcpListener, shutdown: F) -> Result<(), BootstrapError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let sweep = self.sessions.clone().spawn_expiry_sweep(self.sweep_interval);

        let result = Server::new(self.state.clone())
            .serve(listener, shutdown)
            .await;

        let closing = self.registry.close_all().await;
        if closing > 0 {
            tracing::info!("Closing {} open connection(s)", closing);
            drain(&self.registry).await;
        }
        sweep.stop().await;

        Ok(result?)
    }
}

async fn drain(registry: &RoomRegistry) {
    let wait = async {
        while registry.connection_count().await > 0 {
            tokio::time::sleep(DRAIN_POLL_INTERVAL).await;
        }
    };
    if tokio::time::timeout(DRAIN_TIMEOUT, wait).await.is_err() {
        tracing::warn!(
            "{} connection(s) still open after shutdown timeout",
            registry.connection_count().await
        );
    }
}
