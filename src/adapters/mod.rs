//! Adapters. Implement ports against Telegram, summarization backends and the terminal.

pub mod ai;
pub mod telegram;
pub mod ui;
