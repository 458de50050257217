//! Token estimation and greedy batch planning for rolling summarization.

use crate::domain::format::format_for_summary;
use crate::domain::{Batch, Message};

/// Rough token estimate for `text`.
///
/// ~4 bytes per token for text dominated by single-byte characters. When the UTF-8 byte count
/// exceeds twice the character count (CJK, emoji-heavy text), ~2 characters per token.
pub fn estimate_tokens(text: &str) -> usize {
    let byte_count = text.len();
    let char_count = text.chars().count();
    if byte_count > char_count * 2 {
        char_count / 2
    } else {
        byte_count / 4
    }
}

/// Estimated cost of one message as it appears in the prompt (line plus newline).
pub fn message_tokens(msg: &Message) -> usize {
    let mut line = format_for_summary(msg);
    line.push('\n');
    estimate_tokens(&line)
}

/// Pack chronologically ordered `messages` into batches of at most `max_tokens` each.
///
/// Order is preserved. A message that alone exceeds the budget gets a batch of its own.
pub fn split_into_batches_by_tokens(messages: Vec<Message>, max_tokens: usize) -> Vec<Batch> {
    let mut batches = Vec::new();
    let mut current: Vec<Message> = Vec::new();
    let mut current_tokens = 0usize;

    for msg in messages {
        let cost = message_tokens(&msg);
        if current_tokens + cost > max_tokens && !current.is_empty() {
            batches.extend(Batch::new(std::mem::take(&mut current)));
            current_tokens = 0;
        }
        current.push(msg);
        current_tokens += cost;
    }

    batches.extend(Batch::new(current));
    batches
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::format::tests::msg;

    /// "[2024-01-01 00:00] 1: " + 17 chars + "\n" = 40 bytes = 10 tokens.
    fn ten_token_msg(id: i32) -> Message {
        msg(id, 1704067200, 1, &"x".repeat(17))
    }

    #[test]
    fn test_estimate_tokens_single_width() {
        assert_eq!(estimate_tokens(""), 0);
        assert_eq!(estimate_tokens("abcd"), 1);
        assert_eq!(estimate_tokens(&"a".repeat(400)), 100);
        assert_eq!(estimate_tokens("abcdefg"), 1);
        // Two-byte Cyrillic stays on the bytes/4 path.
        assert_eq!(estimate_tokens("Привет"), 3);
    }

    #[test]
    fn test_estimate_tokens_wide_chars() {
        // 8 CJK characters, 24 bytes.
        assert_eq!(estimate_tokens("你好世界你好世界"), 4);
    }

    #[test]
    fn test_message_tokens_includes_formatting() {
        assert_eq!(message_tokens(&ten_token_msg(1)), 10);
    }

    #[test]
    fn test_each_message_at_budget_gets_own_batch() {
        let messages: Vec<Message> = (1..=5).map(ten_token_msg).collect();
        let batches = split_into_batches_by_tokens(messages, 10);
        assert_eq!(batches.len(), 5);
        for (i, b) in batches.iter().enumerate() {
            assert_eq!(b.len(), 1);
            assert_eq!(b.messages()[0].id, i as i32 + 1);
        }
    }

    #[test]
    fn test_everything_fits_in_one_batch() {
        let messages: Vec<Message> = (1..=4).map(ten_token_msg).collect();
        let batches = split_into_batches_by_tokens(messages, 40);
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].len(), 4);
    }

    #[test]
    fn test_oversized_message_is_alone() {
        let big = msg(2, 1704067200, 1, &"y".repeat(400));
        let messages = vec![ten_token_msg(1), big, ten_token_msg(3)];
        let batches = split_into_batches_by_tokens(messages, 25);
        let shape: Vec<Vec<i32>> = batches
            .iter()
            .map(|b| b.messages().iter().map(|m| m.id).collect())
            .collect();
        assert_eq!(shape, vec![vec![1], vec![2], vec![3]]);
    }

    #[test]
    fn test_greedy_packing_preserves_order_and_is_never_empty() {
        let messages: Vec<Message> = (1..=7).map(ten_token_msg).collect();
        let batches = split_into_batches_by_tokens(messages, 25);
        assert_eq!(batches.len(), 4);
        assert!(batches.iter().all(|b| !b.is_empty()));
        let ids: Vec<i32> = batches
            .into_iter()
            .flat_map(|b| b.into_messages())
            .map(|m| m.id)
            .collect();
        assert_eq!(ids, (1..=7).collect::<Vec<_>>());
    }

    #[test]
    fn test_no_messages_no_batches() {
        assert!(split_into_batches_by_tokens(vec![], 100).is_empty());
    }
}
