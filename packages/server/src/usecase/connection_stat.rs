//! ConnectionStatRecorder: 「どの Identity がどのルームに接続中か」の永続記録
//!
//! ## 横取り（preemption）
//!
//! `acquire` は同じ (ユーザー, ルーム) の既存レコードを削除して新しいレコードを挿入します
//! （1 トランザクション）。削除したレコードに対応する接続がこのプロセスの RoomRegistry に
//! 残っていれば、その接続だけをレジストリから取り出してクローズします。
//! レコードが現役の接続には触れません。
//! 新しい接続要求は常に古い接続に勝ちます。

use std::sync::Arc;

use crate::{
    domain::{
        ConnectionId, ConnectionStat, ConnectionStatRepository, RepositoryError, RoomId, Username,
    },
    infrastructure::RoomRegistry,
};

pub struct ConnectionStatRecorder {
    repository: Arc<dyn ConnectionStatRepository>,
    registry: Arc<RoomRegistry>,
}

impl ConnectionStatRecorder {
    pub fn new(repository: Arc<dyn ConnectionStatRepository>, registry: Arc<RoomRegistry>) -> Self {
        Self {
            repository,
            registry,
        }
    }

    /// 新しい接続 ID でレコードを作成し、同じ (ユーザー, ルーム) の古い接続を横取りする
    pub async fn acquire(
        &self,
        username: &Username,
        room_id: RoomId,
    ) -> Result<ConnectionStat, RepositoryError> {
        let stat = ConnectionStat::new(ConnectionId::generate(), username.clone(), room_id);
        let preempted = self.repository.acquire(&stat).await?;

        for old in &preempted {
            tracing::info!(
                "Connection '{}' of '{}' in room {} preempted by '{}'",
                old.id,
                old.username,
                old.room_id,
                stat.id
            );
        }

        // 横取りしたレコードの接続だけを閉じる。
        // まだ登録前の接続は register 時の is_current 確認で自ら閉じる
        let preempted_ids: Vec<ConnectionId> = preempted.into_iter().map(|old| old.id).collect();
        for connection in self.registry.evict_ids(&preempted_ids).await {
            if connection.close() {
                tracing::info!(
                    "Closed preempted connection '{}' of '{}' in room {}",
                    connection.id(),
                    username,
                    room_id
                );
            }
        }

        Ok(stat)
    }

    /// レコードを削除する。すでに存在しなくてもエラーにはしない
    pub async fn release(&self, id: &ConnectionId) -> Result<bool, RepositoryError> {
        let released = self.repository.release(id).await?;
        if released {
            tracing::debug!("Connection stat '{}' released", id);
        }
        Ok(released)
    }

    /// `id` のレコードがまだ残っているか（横取りされていないか）
    pub async fn is_current(&self, id: &ConnectionId) -> Result<bool, RepositoryError> {
        Ok(self.repository.find(id).await?.is_some())
    }

    /// レジストリに生きた接続がないレコードをすべて削除する（起動時の突き合わせ）
    pub async fn reconcile(&self) -> Result<usize, RepositoryError> {
        let mut stale = 0;
        for stat in self.repository.list_all().await? {
            if self.registry.contains(&stat.id).await {
                continue;
            }
            if self.repository.release(&stat.id).await? {
                stale += 1;
            }
        }

        if stale > 0 {
            tracing::info!("Removed {} stale connection stat(s)", stale);
        }
        Ok(stale)
    }
}
