//! ルームごとの接続レジストリ（RoomRegistry）
//!
//! ## 責務
//!
//! - ルーム ID → 接続中 Connection 一覧の管理
//! - 同じルームの他の接続へのブロードキャスト（送信元を除く）
//! - 横取り（preemption）時の対象接続の取り出し
//!
//! ## 排他制御
//!
//! ルームのマップとすべてのメンバー一覧を 1 つの `Mutex` で守ります。
//! 参加・退出・横取り・ブロードキャストの走査はすべてロックを保持したまま行います。
//! ブロードキャスト中の送信は `UnboundedSender` への投入だけなので、ロック内で待機は発生しません。

use std::{collections::HashMap, sync::Arc};

use tokio::sync::Mutex;

use crate::domain::{Connection, ConnectionId, RoomId};

/// 1 ルーム分の接続一覧
///
/// 最初の接続時に作られ、空になっても削除しない。
#[derive(Debug, Default)]
struct RoomContext {
    connections: Vec<Arc<Connection>>,
}

/// ルーム ID → RoomContext のレジストリ
#[derive(Debug, Default)]
pub struct RoomRegistry {
    rooms: Mutex<HashMap<RoomId, RoomContext>>,
}

impl RoomRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 接続をルームに追加する（RoomContext がなければ作る）
    pub async fn join_room(&self, connection: Arc<Connection>) {
        let mut rooms = self.rooms.lock().await;
        let room_id = connection.room_id();
        tracing::debug!(
            "Connection '{}' of '{}' joined room {}",
            connection.id(),
            connection.username(),
            room_id
        );
        rooms.entry(room_id).or_default().connections.push(connection);
    }

    /// 接続をルームから取り除く
    ///
    /// すでにいない場合は何もせず `false`。
    pub async fn leave(&self, connection: &Connection) -> bool {
        let mut rooms = self.rooms.lock().await;
        let Some(room) = rooms.get_mut(&connection.room_id()) else {
            return false;
        };

        let before = room.connections.len();
        room.connections.retain(|c| c.id() != connection.id());
        let removed = room.connections.len() < before;
        if removed {
            tracing::debug!(
                "Connection '{}' left room {}",
                connection.id(),
                connection.room_id()
            );
        }
        removed
    }

    /// 指定した ID の接続を取り出す（横取り用）
    ///
    /// 横取りされたレコードに対応する接続だけが対象。取り出した接続のクローズは呼び出し側が行う。
    pub async fn evict_ids(&self, ids: &[ConnectionId]) -> Vec<Arc<Connection>> {
        if ids.is_empty() {
            return Vec::new();
        }

        let mut rooms = self.rooms.lock().await;
        let mut evicted = Vec::new();
        for room in rooms.values_mut() {
            let (matched, kept): (Vec<_>, Vec<_>) = room
                .connections
                .drain(..)
                .partition(|c| ids.contains(c.id()));
            room.connections = kept;
            evicted.extend(matched);
        }
        evicted
    }

    /// ID で接続を探す
    pub async fn find(&self, id: &ConnectionId) -> Option<Arc<Connection>> {
        let rooms = self.rooms.lock().await;
        rooms
            .values()
            .flat_map(|room| room.connections.iter())
            .find(|c| c.id() == id)
            .cloned()
    }

    /// ID の接続がレジストリにいるか
    pub async fn contains(&self, id: &ConnectionId) -> bool {
        self.find(id).await.is_some()
    }

    /// `sender` と同じルームの、`sender` 以外のすべての接続へ送信する
    ///
    /// 宛先ごとの送信失敗はログに残してスキップする。配送できた件数を返す。
    pub async fn broadcast(&self, sender: &Connection, payload: &str) -> usize {
        let rooms = self.rooms.lock().await;
        let Some(room) = rooms.get(&sender.room_id()) else {
            return 0;
        };

        let mut delivered = 0;
        for recipient in room.connections.iter().filter(|c| c.id() != sender.id()) {
            match recipient.push(payload.to_string()) {
                Ok(()) => {
                    delivered += 1;
                    tracing::debug!("Broadcasted message to connection '{}'", recipient.id());
                }
                Err(e) => {
                    tracing::warn!(
                        "Failed to push message to connection '{}': {}",
                        recipient.id(),
                        e
                    );
                }
            }
        }
        delivered
    }

    /// すべての接続にクローズを要求する（シャットダウン用）
    ///
    /// レジストリからは外さない。各接続の読み込みループが後始末する。
    pub async fn close_all(&self) -> usize {
        let rooms = self.rooms.lock().await;
        rooms
            .values()
            .flat_map(|room| room.connections.iter())
            .filter(|c| c.close())
            .count()
    }

    /// 全ルームの接続数
    pub async fn connection_count(&self) -> usize {
        let rooms = self.rooms.lock().await;
        rooms.values().map(|room| room.connections.len()).sum()
    }
}
