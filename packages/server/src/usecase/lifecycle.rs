//! ConnectionLifecycle: 接続確立から後始末までの状態機械
//!
//! ## 状態遷移
//!
//! ```text
//! Authenticating → Preempting → Handshaking → Registered → ReadLoop → Closing → Closed
//! ```
//!
//! - `prepare`: Authenticating（Identity 解決とルームの存在確認）→ Preempting（記録の取得）
//! - ハンドシェイク（プロトコルのアップグレード）は UI 層が行う。失敗したら `abort`
//! - `register`: Registered（RoomRegistry への追加）
//! - `run`: ReadLoop。キャンセル、ピアのクローズ、読み込みエラーのいずれかで Closing へ
//! - `teardown`: Closing → Closed。どの経路から何度呼ばれても後始末は一度だけ
//!
//! ## ハンドシェイク中の横取り
//!
//! 記録を取得してからレジストリに入るまでの間に、同じ (ユーザー, ルーム) の新しい接続が
//! 記録を横取りすることがある。その場合レジストリ側には閉じる対象がまだいないため、
//! `register` はレジストリ追加後に自分の記録が残っているかを確認し、
//! 残っていなければ自分で閉じる。

use std::{fmt::Display, pin::pin, sync::Arc};

use futures_util::{Stream, StreamExt};
use roomcast_shared::time::Clock;

use crate::{
    domain::{
        Connection, ConnectionId, ConnectionStat, ConnectionState, DirectoryRepository,
        InboundFrame, MessageHandler, OutboundChannel, RoomId, Timestamp, Username,
    },
    infrastructure::RoomRegistry,
};

use super::{
    authenticate::AuthenticateUseCase, connection_stat::ConnectionStatRecorder,
    error::ConnectError,
};

/// 記録を取得済みで、ハンドシェイク待ちの接続
#[derive(Debug)]
pub struct PendingConnection {
    stat: ConnectionStat,
}

impl PendingConnection {
    pub fn id(&self) -> &ConnectionId {
        &self.stat.id
    }

    pub fn username(&self) -> &Username {
        &self.stat.username
    }

    pub fn room_id(&self) -> RoomId {
        self.stat.room_id
    }
}

pub struct ConnectionLifecycle {
    auth: Arc<AuthenticateUseCase>,
    directory: Arc<dyn DirectoryRepository>,
    recorder: Arc<ConnectionStatRecorder>,
    registry: Arc<RoomRegistry>,
    handler: Arc<dyn MessageHandler>,
    clock: Arc<dyn Clock>,
}

impl ConnectionLifecycle {
    pub fn new(
        auth: Arc<AuthenticateUseCase>,
        directory: Arc<dyn DirectoryRepository>,
        recorder: Arc<ConnectionStatRecorder>,
        registry: Arc<RoomRegistry>,
        handler: Arc<dyn MessageHandler>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            auth,
            directory,
            recorder,
            registry,
            handler,
            clock,
        }
    }

    /// Authenticating → Preempting
    ///
    /// 失敗した場合は何の状態も変更しない。
    pub async fn prepare(
        &self,
        token: Option<&str>,
        room_id: RoomId,
    ) -> Result<PendingConnection, ConnectError> {
        tracing::debug!("Connect to room {}: {:?}", room_id, ConnectionState::Authenticating);
        let username = self.auth.execute(token).await.map_err(|e| {
            tracing::warn!("Rejected connection to room {}: {}", room_id, e);
            ConnectError::from(e)
        })?;

        if self.directory.find_room(room_id).await?.is_none() {
            tracing::warn!("'{}' tried to connect to unknown room {}", username, room_id);
            return Err(ConnectError::RoomNotFound(room_id));
        }

        tracing::debug!(
            "Connect '{}' to room {}: {:?}",
            username,
            room_id,
            ConnectionState::Preempting
        );
        let stat = self.recorder.acquire(&username, room_id).await.map_err(|e| {
            tracing::error!("Failed to record connection of '{}': {}", username, e);
            ConnectError::Storage(e)
        })?;

        Ok(PendingConnection { stat })
    }

    /// ハンドシェイクに失敗した接続の記録を解放する
    ///
    /// 横取りされてすでに記録がない場合も何もしない。
    pub async fn abort(&self, id: &ConnectionId) {
        tracing::warn!("Handshake of connection '{}' failed, releasing its record", id);
        if let Err(e) = self.recorder.release(id).await {
            tracing::error!("Failed to release connection '{}': {}", id, e);
        }
    }

    /// Handshaking → Registered
    pub async fn register(
        &self,
        pending: PendingConnection,
        outbound: OutboundChannel,
    ) -> Result<Arc<Connection>, ConnectError> {
        let PendingConnection { stat } = pending;
        let connection = Arc::new(Connection::new(
            stat.id,
            stat.username,
            stat.room_id,
            Timestamp::new(self.clock.now_millis()),
            outbound,
        ));

        self.registry.join_room(connection.clone()).await;

        match self.recorder.is_current(connection.id()).await {
            Ok(true) => {
                tracing::info!(
                    "Connection '{}' of '{}' registered in room {}",
                    connection.id(),
                    connection.username(),
                    connection.room_id()
                );
                Ok(connection)
            }
            Ok(false) => {
                tracing::info!(
                    "Connection '{}' was superseded during handshake",
                    connection.id()
                );
                self.teardown(&connection).await;
                Err(ConnectError::Superseded(connection.id().clone()))
            }
            Err(e) => {
                tracing::error!(
                    "Failed to verify record of connection '{}': {}",
                    connection.id(),
                    e
                );
                self.teardown(&connection).await;
                Err(ConnectError::Storage(e))
            }
        }
    }

    /// ReadLoop → Closing → Closed
    ///
    /// 受信したテキスト・バイナリフレームを MessageHandler に渡す。
    /// キャンセル（横取り・サーバー側のクローズ）、ピアのクローズフレーム、
    /// 読み込みエラー、ストリーム終端のいずれかでループを抜け、後始末する。
    pub async fn run<S, E>(&self, connection: Arc<Connection>, inbound: S)
    where
        S: Stream<Item = Result<InboundFrame, E>>,
        E: Display,
    {
        let mut inbound = pin!(inbound);
        connection.start_reading();

        loop {
            let frame = tokio::select! {
                biased;
                _ = connection.cancelled() => {
                    tracing::info!("Connection '{}' cancelled", connection.id());
                    break;
                }
                frame = inbound.next() => frame,
            };

            match frame {
                Some(Ok(InboundFrame::Text(text))) => {
                    tracing::debug!("Received text from '{}': {}", connection.id(), text);
                    self.handler.handle(&connection, text.as_bytes()).await;
                }
                Some(Ok(InboundFrame::Binary(bytes))) => {
                    self.handler.handle(&connection, &bytes).await;
                }
                Some(Ok(InboundFrame::Ping | InboundFrame::Pong)) => {}
                Some(Ok(InboundFrame::Close)) => {
                    tracing::info!("Connection '{}' closed by peer", connection.id());
                    break;
                }
                Some(Err(e)) => {
                    tracing::warn!("Read error on connection '{}': {}", connection.id(), e);
                    break;
                }
                None => {
                    tracing::info!("Connection '{}' disconnected", connection.id());
                    break;
                }
            }
        }

        self.teardown(&connection).await;
    }

    /// 接続を閉じ、レジストリから外し、記録を解放する（一度だけ）
    pub async fn teardown(&self, connection: &Connection) {
        connection.close();
        if !connection.finish() {
            return;
        }

        self.registry.leave(connection).await;
        if let Err(e) = self.recorder.release(connection.id()).await {
            tracing::error!(
                "Failed to release record of connection '{}': {}",
                connection.id(),
                e
            );
        }

        let elapsed = self.clock.now_millis() - connection.connected_at().value();
        tracing::info!(
            "Connection '{}' of '{}' left room {} after {} ms",
            connection.id(),
            connection.username(),
            connection.room_id(),
            elapsed
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        domain::{
            ConnectionStatRepository, MockConnectionStatRepository, OutboundFrame, Session,
        },
        infrastructure::{
            Database, JwtTokenIssuer, SharedConnection,
            dto::websocket::ChatMessage,
            repository::{
                SqliteConnectionStatRepository, SqliteDirectoryRepository,
                SqliteSessionRepository, SqliteUserRepository,
            },
        },
        usecase::{
            broadcast::BroadcastHub,
            error::AuthError,
            session_store::{DEFAULT_SESSION_TTL, SessionStore},
        },
    };
    use roomcast_shared::time::ManualClock;
    use std::{convert::Infallible, time::Duration};
    use tokio::sync::{mpsc, oneshot};

    const TEST_SECRET: &str = "roomcast_test_secret_that_is_long_enough";

    struct Fixture {
        lifecycle: Arc<ConnectionLifecycle>,
        sessions: Arc<SessionStore>,
        registry: Arc<RoomRegistry>,
        stats: Arc<dyn ConnectionStatRepository>,
    }

    async fn create_fixture_with<F>(make_stats: F) -> Fixture
    where
        F: FnOnce(SharedConnection) -> Arc<dyn ConnectionStatRepository>,
    {
        let db = Database::open_in_memory().unwrap();
        db.seed_defaults().await.unwrap();
        let clock: Arc<dyn Clock> = Arc::new(ManualClock::new(0));
        let sessions = Arc::new(SessionStore::new(
            Arc::new(SqliteSessionRepository::new(db.connection())),
            Arc::new(JwtTokenIssuer::new(TEST_SECRET).unwrap()),
            clock.clone(),
            DEFAULT_SESSION_TTL,
        ));
        let auth = Arc::new(AuthenticateUseCase::new(
            sessions.clone(),
            Arc::new(SqliteUserRepository::new(db.connection())),
        ));
        let stats = make_stats(db.connection());
        let registry = Arc::new(RoomRegistry::new());
        let recorder = Arc::new(ConnectionStatRecorder::new(stats.clone(), registry.clone()));
        let hub = Arc::new(BroadcastHub::new(registry.clone(), clock.clone()));
        let lifecycle = Arc::new(ConnectionLifecycle::new(
            auth,
            Arc::new(SqliteDirectoryRepository::new(db.connection())),
            recorder,
            registry.clone(),
            hub,
            clock,
        ));
        Fixture {
            lifecycle,
            sessions,
            registry,
            stats,
        }
    }

    async fn create_fixture() -> Fixture {
        create_fixture_with(|conn| -> Arc<dyn ConnectionStatRepository> {
            Arc::new(SqliteConnectionStatRepository::new(conn))
        })
        .await
    }

    async fn login(fixture: &Fixture, name: &str) -> Session {
        fixture
            .sessions
            .create(&Username::new(name.to_string()).unwrap())
            .await
            .unwrap()
    }

    struct TestPeer {
        connection: Arc<Connection>,
        outbound: mpsc::UnboundedReceiver<OutboundFrame>,
        inbound: mpsc::UnboundedSender<Result<InboundFrame, Infallible>>,
        task: tokio::task::JoinHandle<()>,
    }

    /// prepare → register → run（別タスク）まで進めた接続
    async fn connect(fixture: &Fixture, session: &Session, room: i64) -> TestPeer {
        let pending = fixture
            .lifecycle
            .prepare(Some(session.token.as_str()), RoomId::new(room))
            .await
            .unwrap();
        let (out_tx, out_rx) = mpsc::unbounded_channel();
        let connection = fixture.lifecycle.register(pending, out_tx).await.unwrap();

        let (in_tx, mut in_rx) = mpsc::unbounded_channel();
        let inbound = futures_util::stream::poll_fn(move |cx| in_rx.poll_recv(cx));
        let lifecycle = fixture.lifecycle.clone();
        let running = connection.clone();
        let task = tokio::spawn(async move { lifecycle.run(running, inbound).await });

        TestPeer {
            connection,
            outbound: out_rx,
            inbound: in_tx,
            task,
        }
    }

    async fn wait_for(task: tokio::task::JoinHandle<()>) {
        tokio::time::timeout(Duration::from_secs(2), task)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn test_prepare_without_valid_token_mutates_nothing() {
        // テスト項目: 認証に失敗した接続要求は記録を作らない
        // given (前提条件):
        let fixture = create_fixture().await;

        // when (操作):
        let missing = fixture.lifecycle.prepare(None, RoomId::new(1)).await;
        let invalid = fixture
            .lifecycle
            .prepare(Some("garbage"), RoomId::new(1))
            .await;

        // then (期待する結果):
        assert!(matches!(
            missing,
            Err(ConnectError::Unauthorized(AuthError::MissingToken))
        ));
        assert!(matches!(
            invalid,
            Err(ConnectError::Unauthorized(AuthError::InvalidToken))
        ));
        assert!(fixture.stats.list_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_prepare_for_unknown_room_does_not_preempt() {
        // テスト項目: 存在しないルームへの接続要求では既存の接続を横取りしない
        // given (前提条件):
        let fixture = create_fixture().await;
        let session = login(&fixture, "admin").await;
        let peer = connect(&fixture, &session, 1).await;

        // when (操作):
        let result = fixture
            .lifecycle
            .prepare(Some(session.token.as_str()), RoomId::new(99))
            .await;

        // then (期待する結果):
        assert!(matches!(result, Err(ConnectError::RoomNotFound(_))));
        assert!(!peer.connection.state().is_terminating());
        assert_eq!(fixture.stats.list_all().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_message_is_relayed_to_other_members_only() {
        // テスト項目: {A, B, C} のルームで A のメッセージは B と C にだけ届く
        // given (前提条件):
        let fixture = create_fixture().await;
        let mut a = connect(&fixture, &login(&fixture, "alice").await, 1).await;
        let mut b = connect(&fixture, &login(&fixture, "bob").await, 1).await;
        let mut c = connect(&fixture, &login(&fixture, "carol").await, 1).await;

        // when (操作):
        a.inbound
            .send(Ok(InboundFrame::Text(r#"{"content":"hi"}"#.to_string())))
            .unwrap();

        // then (期待する結果):
        for peer in [&mut b, &mut c] {
            let frame = tokio::time::timeout(Duration::from_secs(2), peer.outbound.recv())
                .await
                .unwrap();
            let Some(OutboundFrame::Text(text)) = frame else {
                panic!("expected text frame, got {frame:?}");
            };
            let message: ChatMessage = serde_json::from_str(&text).unwrap();
            assert_eq!(message.content, "hi");
            assert_eq!(message.sender.as_deref(), Some("alice"));
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(a.outbound.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_peer_close_tears_down_once() {
        // テスト項目: ピアのクローズでレジストリと記録から消え、Closed になる
        // given (前提条件):
        let fixture = create_fixture().await;
        let peer = connect(&fixture, &login(&fixture, "alice").await, 1).await;

        // when (操作):
        peer.inbound.send(Ok(InboundFrame::Close)).unwrap();
        wait_for(peer.task).await;

        // then (期待する結果):
        assert_eq!(peer.connection.state(), ConnectionState::Closed);
        assert_eq!(fixture.registry.connection_count().await, 0);
        assert!(fixture.stats.list_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_read_error_ends_connection() {
        // テスト項目: 読み込みエラーでも同じ後始末が行われる
        // given (前提条件):
        let fixture = create_fixture().await;
        let session = login(&fixture, "alice").await;
        let pending = fixture
            .lifecycle
            .prepare(Some(session.token.as_str()), RoomId::new(1))
            .await
            .unwrap();
        let (out_tx, _out_rx) = mpsc::unbounded_channel();
        let connection = fixture.lifecycle.register(pending, out_tx).await.unwrap();
        let inbound = futures_util::stream::iter(vec![
            Ok(InboundFrame::Text("not json".to_string())),
            Err("connection reset"),
        ]);

        // when (操作):
        fixture.lifecycle.run(connection.clone(), inbound).await;

        // then (期待する結果):
        assert_eq!(connection.state(), ConnectionState::Closed);
        assert!(fixture.stats.list_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_second_connect_preempts_first() {
        // テスト項目: 同じ (ユーザー, ルーム) の 2 回目の接続で 1 回目が閉じられ、記録は 1 件だけ
        // given (前提条件):
        let fixture = create_fixture().await;
        let session = login(&fixture, "admin").await;
        let mut first = connect(&fixture, &session, 1).await;

        // when (操作):
        let second = connect(&fixture, &session, 1).await;
        wait_for(first.task).await;

        // then (期待する結果):
        assert_eq!(first.outbound.recv().await, Some(OutboundFrame::Close));
        assert_eq!(first.connection.state(), ConnectionState::Closed);
        let records = fixture.stats.list_all().await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(&records[0].id, second.connection.id());
        assert!(fixture.registry.contains(second.connection.id()).await);
        assert!(!fixture.registry.contains(first.connection.id()).await);
    }

    /// 最初の acquire だけ、コミット後に呼び出し元へ戻る前で止める記録ストア
    struct PausingStatRepository {
        inner: SqliteConnectionStatRepository,
        committed: std::sync::Mutex<Option<oneshot::Sender<()>>>,
        resume: tokio::sync::Mutex<Option<oneshot::Receiver<()>>>,
    }

    #[async_trait::async_trait]
    impl ConnectionStatRepository for PausingStatRepository {
        async fn acquire(
            &self,
            stat: &ConnectionStat,
        ) -> Result<Vec<ConnectionStat>, crate::domain::RepositoryError> {
            let preempted = self.inner.acquire(stat).await?;
            let resume = self.resume.lock().await.take();
            if let Some(resume) = resume {
                let committed = self.committed.lock().unwrap().take();
                if let Some(committed) = committed {
                    let _ = committed.send(());
                }
                let _ = resume.await;
            }
            Ok(preempted)
        }

        async fn release(&self, id: &ConnectionId) -> Result<bool, crate::domain::RepositoryError> {
            self.inner.release(id).await
        }

        async fn find(
            &self,
            id: &ConnectionId,
        ) -> Result<Option<ConnectionStat>, crate::domain::RepositoryError> {
            self.inner.find(id).await
        }

        async fn list_all(&self) -> Result<Vec<ConnectionStat>, crate::domain::RepositoryError> {
            self.inner.list_all().await
        }
    }

    #[tokio::test]
    async fn test_delayed_older_connect_does_not_close_newer_connection() {
        // テスト項目: 記録をコミットした後に遅れた古い接続要求は、後から登録を終えた新しい接続を閉じない
        // given (前提条件):
        let (committed_tx, committed_rx) = oneshot::channel();
        let (resume_tx, resume_rx) = oneshot::channel();
        let fixture = create_fixture_with(move |conn| -> Arc<dyn ConnectionStatRepository> {
            Arc::new(PausingStatRepository {
                inner: SqliteConnectionStatRepository::new(conn),
                committed: std::sync::Mutex::new(Some(committed_tx)),
                resume: tokio::sync::Mutex::new(Some(resume_rx)),
            })
        })
        .await;
        let session = login(&fixture, "admin").await;

        let older = {
            let lifecycle = fixture.lifecycle.clone();
            let token = session.token.as_str().to_string();
            tokio::spawn(async move {
                let pending = lifecycle.prepare(Some(token.as_str()), RoomId::new(1)).await?;
                let (tx, _rx) = mpsc::unbounded_channel();
                lifecycle.register(pending, tx).await
            })
        };
        committed_rx.await.unwrap();

        // when (操作):
        let newer = connect(&fixture, &session, 1).await;
        resume_tx.send(()).unwrap();
        let older_result = tokio::time::timeout(Duration::from_secs(2), older)
            .await
            .unwrap()
            .unwrap();

        // then (期待する結果):
        assert!(matches!(older_result, Err(ConnectError::Superseded(_))));
        assert!(!newer.connection.state().is_terminating());
        assert!(fixture.registry.contains(newer.connection.id()).await);
        assert_eq!(fixture.registry.connection_count().await, 1);
        let records = fixture.stats.list_all().await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(&records[0].id, newer.connection.id());
    }

    #[tokio::test]
    async fn test_register_after_being_superseded_fails() {
        // テスト項目: ハンドシェイク中に横取りされた接続は登録されない
        // given (前提条件):
        let fixture = create_fixture().await;
        let session = login(&fixture, "admin").await;
        let stale = fixture
            .lifecycle
            .prepare(Some(session.token.as_str()), RoomId::new(1))
            .await
            .unwrap();
        let fresh = fixture
            .lifecycle
            .prepare(Some(session.token.as_str()), RoomId::new(1))
            .await
            .unwrap();
        let fresh_id = fresh.id().clone();

        // when (操作):
        let (tx, _rx) = mpsc::unbounded_channel();
        let result = fixture.lifecycle.register(stale, tx).await;

        // then (期待する結果):
        assert!(matches!(result, Err(ConnectError::Superseded(_))));
        assert_eq!(fixture.registry.connection_count().await, 0);
        let records = fixture.stats.list_all().await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id, fresh_id);
    }

    #[tokio::test]
    async fn test_abort_releases_record() {
        // テスト項目: ハンドシェイク失敗時は取得した記録が解放される
        // given (前提条件):
        let fixture = create_fixture().await;
        let session = login(&fixture, "admin").await;
        let pending = fixture
            .lifecycle
            .prepare(Some(session.token.as_str()), RoomId::new(1))
            .await
            .unwrap();

        // when (操作):
        fixture.lifecycle.abort(pending.id()).await;

        // then (期待する結果):
        assert!(fixture.stats.list_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_teardown_releases_record_once() {
        // テスト項目: 後始末が 2 つの経路から同時に呼ばれても記録の削除は 1 回だけ
        // given (前提条件):
        let mut stats = MockConnectionStatRepository::new();
        stats.expect_acquire().returning(|_| Ok(Vec::new()));
        stats.expect_find().returning(|id| {
            Ok(Some(ConnectionStat::new(
                id.clone(),
                Username::new("admin".to_string()).unwrap(),
                RoomId::new(1),
            )))
        });
        stats.expect_release().times(1).returning(|_| Ok(true));
        let fixture = create_fixture_with(move |_| -> Arc<dyn ConnectionStatRepository> { Arc::new(stats) }).await;
        let session = login(&fixture, "admin").await;
        let pending = fixture
            .lifecycle
            .prepare(Some(session.token.as_str()), RoomId::new(1))
            .await
            .unwrap();
        let (tx, _rx) = mpsc::unbounded_channel();
        let connection = fixture.lifecycle.register(pending, tx).await.unwrap();

        // when (操作):
        let local = {
            let lifecycle = fixture.lifecycle.clone();
            let connection = connection.clone();
            tokio::spawn(async move { lifecycle.teardown(&connection).await })
        };
        let remote = {
            let lifecycle = fixture.lifecycle.clone();
            let connection = connection.clone();
            tokio::spawn(async move { lifecycle.teardown(&connection).await })
        };
        wait_for(local).await;
        wait_for(remote).await;

        // then (期待する結果):
        assert_eq!(connection.state(), ConnectionState::Closed);
        assert_eq!(fixture.registry.connection_count().await, 0);
    }
}
