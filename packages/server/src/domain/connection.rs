//! メモリ上の接続ハンドル（Connection）とそのライフサイクル状態
//!
//! ## 概要
//!
//! Connection はソケットそのものを持たず、書き込みタスクへの送信チャンネルと
//! 状態（`watch` チャンネル）だけを保持します。
//! 読み込みは接続ごとに 1 つのタスクが専有し、クローズ要求はどのタスクからでも出せます。
//!
//! ## 状態遷移
//!
//! ```text
//! Authenticating → Preempting → Handshaking → Registered → ReadLoop → Closing → Closed
//! ```
//!
//! Connection が生成されるのは Registered から。それより前の状態はログにのみ現れます。
//! Closing / Closed への遷移はそれぞれ一度だけ成功し、二度目以降は `false` を返します。

use tokio::sync::{mpsc, watch};

use super::{
    error::PushError,
    value_object::{ConnectionId, RoomId, Timestamp, Username},
};

/// 接続のライフサイクル状態
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ConnectionState {
    Authenticating,
    Preempting,
    Handshaking,
    Registered,
    ReadLoop,
    Closing,
    Closed,
}

impl ConnectionState {
    /// Closing または Closed か
    pub fn is_terminating(&self) -> bool {
        *self >= ConnectionState::Closing
    }
}

/// 書き込みタスクへ渡すフレーム
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboundFrame {
    Text(String),
    /// クローズ通知を送ってからソケットを閉じる
    Close,
}

/// 読み込みループが受け取るフレーム（トランスポート非依存）
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundFrame {
    Text(String),
    Binary(Vec<u8>),
    Ping,
    Pong,
    /// ピアからのクローズフレーム
    Close,
}

/// 書き込みタスクへの送信チャンネル
pub type OutboundChannel = mpsc::UnboundedSender<OutboundFrame>;

/// 接続中クライアントのハンドル
#[derive(Debug)]
pub struct Connection {
    id: ConnectionId,
    username: Username,
    room_id: RoomId,
    connected_at: Timestamp,
    outbound: OutboundChannel,
    state: watch::Sender<ConnectionState>,
}

impl Connection {
    /// Registered 状態の Connection を作成
    pub fn new(
        id: ConnectionId,
        username: Username,
        room_id: RoomId,
        connected_at: Timestamp,
        outbound: OutboundChannel,
    ) -> Self {
        let (state, _) = watch::channel(ConnectionState::Registered);
        Self {
            id,
            username,
            room_id,
            connected_at,
            outbound,
            state,
        }
    }

    pub fn id(&self) -> &ConnectionId {
        &self.id
    }

    pub fn username(&self) -> &Username {
        &self.username
    }

    pub fn room_id(&self) -> RoomId {
        self.room_id
    }

    pub fn connected_at(&self) -> Timestamp {
        self.connected_at
    }

    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    /// テキストフレームを書き込みタスクへ渡す
    ///
    /// Closing 以降の接続には送らない。
    pub fn push(&self, text: String) -> Result<(), PushError> {
        if self.state().is_terminating() {
            return Err(PushError::ConnectionClosed(self.id.to_string()));
        }
        self.outbound
            .send(OutboundFrame::Text(text))
            .map_err(|_| PushError::ChannelClosed(self.id.to_string()))
    }

    /// Registered → ReadLoop
    pub fn start_reading(&self) -> bool {
        self.state.send_if_modified(|state| {
            if *state == ConnectionState::Registered {
                *state = ConnectionState::ReadLoop;
                true
            } else {
                false
            }
        })
    }

    /// クローズを要求する（→ Closing）
    ///
    /// 最初の呼び出しだけが書き込みタスクへクローズ通知を送り `true` を返す。
    /// すでに Closing / Closed なら何もせず `false`。
    pub fn close(&self) -> bool {
        let transitioned = self.state.send_if_modified(|state| {
            if state.is_terminating() {
                false
            } else {
                *state = ConnectionState::Closing;
                true
            }
        });
        if transitioned {
            // 書き込みタスクが先に終了していてもよい
            let _ = self.outbound.send(OutboundFrame::Close);
        }
        transitioned
    }

    /// 後始末の完了を記録する（→ Closed）
    ///
    /// 一度だけ `true` を返す。二重の後始末を防ぐガードとして使う。
    pub fn finish(&self) -> bool {
        self.state.send_if_modified(|state| {
            if *state == ConnectionState::Closed {
                false
            } else {
                *state = ConnectionState::Closed;
                true
            }
        })
    }

    /// Closing 以降に遷移するまで待つ（キャンセルシグナル）
    pub async fn cancelled(&self) {
        let mut receiver = self.state.subscribe();
        // Sender は self が保持しているため、待機中に閉じることはない
        let _ = receiver.wait_for(|state| state.is_terminating()).await;
    }
}
