//! Message formatting utilities for client display.

use roomcast_shared::time::timestamp_to_jst_clock;

/// Message formatter for client display
pub struct MessageFormatter;

impl MessageFormatter {
    /// Format the banner shown once the room is joined
    pub fn format_joined(username: &str, room: &str) -> String {
        format!(
            "\n============================================================\n\
             Joined room {} as '{}'. Type messages and press Enter to send.\n\
             Press Ctrl+C to exit.\n\
             ============================================================\n",
            room, username
        )
    }

    /// Format a relayed chat message
    ///
    /// A missing sender is shown as `?`, a missing timestamp as `--:--:--`.
    pub fn format_chat_message(sender: Option<&str>, content: &str, sent_at: Option<i64>) -> String {
        let clock = sent_at
            .map(timestamp_to_jst_clock)
            .unwrap_or_else(|| "--:--:--".to_string());
        format!("\n[{}] @{}: {}\n", clock, sender.unwrap_or("?"), content)
    }

    /// Format a confirmation message after sending
    pub fn format_sent_confirmation(sent_at: i64) -> String {
        format!("sent at {}\n", timestamp_to_jst_clock(sent_at))
    }

    /// Format a binary message notification
    pub fn format_binary_message(byte_count: usize) -> String {
        format!("\n← Received {} bytes of binary data\n", byte_count)
    }

    /// Format a raw text message (when parsing fails)
    pub fn format_raw_message(text: &str) -> String {
        format!("\n← Received: {}\n", text)
    }
}
