//! BroadcastHub: 受信したメッセージを同じルームの他の接続へ配送する
//!
//! - 受信フレームを `ChatMessage` として解釈できなければ黙って捨てる
//! - `sender` は送信元接続の認証済み Identity で上書きする
//! - `timestamp` がなければ受信時刻を入れる
//! - 配送はベストエフォート（宛先ごとの失敗はスキップ、再送なし）

use std::sync::Arc;

use async_trait::async_trait;
use roomcast_shared::time::Clock;

use crate::{
    domain::{Connection, MessageHandler},
    infrastructure::{RoomRegistry, dto::websocket::ChatMessage},
};

pub struct BroadcastHub {
    registry: Arc<RoomRegistry>,
    clock: Arc<dyn Clock>,
}

impl BroadcastHub {
    pub fn new(registry: Arc<RoomRegistry>, clock: Arc<dyn Clock>) -> Self {
        Self { registry, clock }
    }

    /// フレームを配送し、届いた宛先数を返す（不正なフレームは `None`）
    pub async fn deliver(&self, connection: &Connection, frame: &[u8]) -> Option<usize> {
        let mut message: ChatMessage = match serde_json::from_slice(frame) {
            Ok(message) => message,
            Err(e) => {
                tracing::debug!(
                    "Dropped malformed frame from connection '{}': {}",
                    connection.id(),
                    e
                );
                return None;
            }
        };

        message.sender = Some(connection.username().as_str().to_string());
        message.timestamp.get_or_insert_with(|| self.clock.now_millis());

        let payload = match serde_json::to_string(&message) {
            Ok(payload) => payload,
            Err(e) => {
                tracing::warn!("Failed to serialize chat message: {}", e);
                return None;
            }
        };

        let delivered = self.registry.broadcast(connection, &payload).await;
        tracing::debug!(
            "Message from '{}' in room {} delivered to {} connection(s)",
            connection.username(),
            connection.room_id(),
            delivered
        );
        Some(delivered)
    }
}

#[async_trait]
impl MessageHandler for BroadcastHub {
    async fn handle(&self, connection: &Connection, frame: &[u8]) {
        self.deliver(connection, frame).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ConnectionId, OutboundFrame, RoomId, Timestamp, Username};
    use roomcast_shared::time::ManualClock;
    use tokio::sync::mpsc;

    fn create_connection(
        username: &str,
    ) -> (Arc<Connection>, mpsc::UnboundedReceiver<OutboundFrame>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let connection = Connection::new(
            ConnectionId::generate(),
            Username::new(username.to_string()).unwrap(),
            RoomId::new(1),
            Timestamp::new(0),
            tx,
        );
        (Arc::new(connection), rx)
    }

    async fn create_hub_with_room() -> (
        BroadcastHub,
        Arc<Connection>,
        mpsc::UnboundedReceiver<OutboundFrame>,
        mpsc::UnboundedReceiver<OutboundFrame>,
    ) {
        let registry = Arc::new(RoomRegistry::new());
        let (alice, rx_alice) = create_connection("alice");
        let (bob, rx_bob) = create_connection("bob");
        registry.join_room(alice.clone()).await;
        registry.join_room(bob).await;
        let hub = BroadcastHub::new(registry, Arc::new(ManualClock::new(42)));
        (hub, alice, rx_alice, rx_bob)
    }

    fn received_message(rx: &mut mpsc::UnboundedReceiver<OutboundFrame>) -> ChatMessage {
        match rx.try_recv() {
            Ok(OutboundFrame::Text(text)) => serde_json::from_str(&text).unwrap(),
            other => panic!("expected text frame, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_deliver_stamps_sender_and_timestamp() {
        // テスト項目: 配送されるメッセージに送信者と受信時刻が入る
        // given (前提条件):
        let (hub, alice, mut rx_alice, mut rx_bob) = create_hub_with_room().await;

        // when (操作):
        let delivered = hub.deliver(&alice, br#"{"content":"hi"}"#).await;

        // then (期待する結果):
        assert_eq!(delivered, Some(1));
        let message = received_message(&mut rx_bob);
        assert_eq!(message.content, "hi");
        assert_eq!(message.sender.as_deref(), Some("alice"));
        assert_eq!(message.timestamp, Some(42));
        assert!(rx_alice.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_deliver_overrides_spoofed_sender() {
        // テスト項目: クライアントが指定した sender は認証済みの Identity で上書きされる
        // given (前提条件):
        let (hub, alice, _rx_alice, mut rx_bob) = create_hub_with_room().await;

        // when (操作):
        hub.deliver(&alice, br#"{"content":"hi","sender":"mallory","timestamp":7}"#)
            .await;

        // then (期待する結果):
        let message = received_message(&mut rx_bob);
        assert_eq!(message.sender.as_deref(), Some("alice"));
        assert_eq!(message.timestamp, Some(7));
    }

    #[tokio::test]
    async fn test_deliver_drops_malformed_frame() {
        // テスト項目: 解釈できないフレームは誰にも配送されない
        // given (前提条件):
        let (hub, alice, _rx_alice, mut rx_bob) = create_hub_with_room().await;

        // when (操作):
        let not_json = hub.deliver(&alice, b"hello").await;
        let wrong_shape = hub.deliver(&alice, br#"{"text":"hello"}"#).await;

        // then (期待する結果):
        assert_eq!(not_json, None);
        assert_eq!(wrong_shape, None);
        assert!(rx_bob.try_recv().is_err());
    }
}
