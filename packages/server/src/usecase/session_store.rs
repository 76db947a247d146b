//! SessionStore: ログインセッションの作成・解決・期限切れ掃除
//!
//! ## 概要
//!
//! - `create`: 同じ Identity の既存セッションを削除してから新しいセッションを保存する
//! - `resolve`: トークンでセッションを探す（期限切れの判定はしない）
//! - `is_expired`: now >= expires_at なら期限切れ
//! - `spawn_expiry_sweep`: 一定間隔で期限切れセッションを削除するバックグラウンドタスク
//!
//! 「見つからない」と「見つかったが期限切れ」は呼び出し側で区別できるよう、
//! `resolve` と `is_expired` を分けています。

use std::{sync::Arc, time::Duration};

use roomcast_shared::time::Clock;
use tokio::{
    sync::oneshot,
    task::JoinHandle,
    time::{MissedTickBehavior, interval},
};

use crate::domain::{
    RepositoryError, Session, SessionRepository, SessionToken, Timestamp, TokenError, TokenIssuer,
    Username,
};

use super::error::SessionStoreError;

/// セッションの有効期間（30 分）
pub const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(30 * 60);

/// 期限切れ掃除の間隔（30 秒）
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(30);

pub struct SessionStore {
    repository: Arc<dyn SessionRepository>,
    token_issuer: Arc<dyn TokenIssuer>,
    clock: Arc<dyn Clock>,
    ttl: Duration,
}

impl SessionStore {
    pub fn new(
        repository: Arc<dyn SessionRepository>,
        token_issuer: Arc<dyn TokenIssuer>,
        clock: Arc<dyn Clock>,
        ttl: Duration,
    ) -> Self {
        Self {
            repository,
            token_issuer,
            clock,
            ttl,
        }
    }

    /// `username` の新しいセッションを作成する
    ///
    /// 既存のセッションは同じトランザクションで削除される。
    pub async fn create(&self, username: &Username) -> Result<Session, SessionStoreError> {
        let created_at = Timestamp::new(self.clock.now_millis());
        let ttl_millis = i64::try_from(self.ttl.as_millis()).unwrap_or(i64::MAX);
        let expires_at = created_at.plus_millis(ttl_millis);

        let token = self.token_issuer.issue(username, created_at, expires_at)?;
        let session = Session::new(username.clone(), token, created_at, expires_at);
        self.repository.replace(&session).await?;

        tracing::info!(
            "Session created for '{}' (expires at {})",
            username,
            expires_at.value()
        );
        Ok(session)
    }

    /// トークンでセッションを探す
    pub async fn resolve(&self, token: &SessionToken) -> Result<Option<Session>, RepositoryError> {
        self.repository.find_by_token(token).await
    }

    pub fn is_expired(&self, session: &Session) -> bool {
        session.is_expired_at(Timestamp::new(self.clock.now_millis()))
    }

    /// トークンの署名を検証する
    pub fn verify_signature(&self, token: &str) -> Result<Username, TokenError> {
        self.token_issuer.verify(token)
    }

    /// 期限切れセッションを削除し、削除件数を返す
    pub async fn sweep_expired(&self) -> Result<usize, RepositoryError> {
        let now = Timestamp::new(self.clock.now_millis());
        self.repository.delete_expired(now).await
    }

    /// 期限切れ掃除のバックグラウンドタスクを起動する
    pub fn spawn_expiry_sweep(self: Arc<Self>, period: Duration) -> SweepHandle {
        let (stop_tx, mut stop_rx) = oneshot::channel::<()>();

        let task = tokio::spawn(async move {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    biased;
                    _ = &mut stop_rx => break,
                    _ = ticker.tick() => {
                        match self.sweep_expired().await {
                            Ok(0) => {}
                            Ok(count) => tracing::info!("Swept {} expired session(s)", count),
                            Err(e) => tracing::error!("Failed to sweep expired sessions: {}", e),
                        }
                    }
                }
            }

            tracing::debug!("Session expiry sweep stopped");
        });

        SweepHandle {
            stop: Some(stop_tx),
            task,
        }
    }
}

/// 期限切れ掃除タスクのハンドル
#[derive(Debug)]
pub struct SweepHandle {
    stop: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
}

impl SweepHandle {
    /// タイマーを止め、実行中の削除が終わるまで待つ
    pub async fn stop(mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        if let Err(e) = (&mut self.task).await {
            tracing::warn!("Session expiry sweep task ended abnormally: {}", e);
        }
    }
}
