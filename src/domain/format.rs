//! Textual renderings of messages: the compact prompt line and the delimited export block.

use crate::domain::Message;
use std::fmt::Write;

/// Timestamp format for export files.
pub const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Timestamp format for prompt lines.
pub const SHORT_DATE_FORMAT: &str = "%Y-%m-%d %H:%M";

/// `[YYYY-MM-DD HH:MM] sender_id: text`
pub fn format_for_summary(msg: &Message) -> String {
    format!(
        "[{}] {}: {}",
        msg.date.format(SHORT_DATE_FORMAT),
        msg.sender_id,
        msg.text
    )
}

/// One prompt line per text-bearing message, each newline-terminated.
pub fn format_batch_for_summary(messages: &[Message]) -> String {
    let mut out = String::new();
    for msg in messages.iter().filter(|m| m.has_text()) {
        out.push_str(&format_for_summary(msg));
        out.push('\n');
    }
    out
}

/// Export rendering:
///
/// ```text
/// -----
/// [2024-01-15 10:30:00] [@alice] [id=42] [reply_to=41]
/// body
/// -----
/// ```
///
/// Messages without text are skipped. Returns an empty string when nothing is rendered.
pub fn format_batch_for_backup(messages: &[Message]) -> String {
    let mut out = String::with_capacity(messages.len() * 256);

    for msg in messages.iter().filter(|m| m.has_text()) {
        // Writing into a String never fails.
        let _ = write!(
            out,
            "-----\n[{}] [{}] [id={}]",
            msg.date.format(DATE_FORMAT),
            msg.sender_name,
            msg.id
        );
        if let Some(reply_to) = msg.reply_to_id.filter(|id| *id != 0) {
            let _ = write!(out, " [reply_to={}]", reply_to);
        }
        out.push('\n');
        out.push_str(&msg.text);
        out.push('\n');
    }

    if !out.is_empty() {
        out.push_str("-----");
    }
    out
}

/// Keep only messages with a non-empty text body.
pub fn filter_text_only(messages: Vec<Message>) -> Vec<Message> {
    messages.into_iter().filter(Message::has_text).collect()
}

/// Turn platform order (newest first) into chronological order.
pub fn into_chronological(mut messages: Vec<Message>) -> Vec<Message> {
    messages.reverse();
    messages
}
