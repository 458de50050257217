//! Domain entities. Pure data structures for the core business.
//!
//! No Telegram/IO types here; adapters map into these.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Default page size for a single history request.
pub const DEFAULT_PAGE_SIZE: i32 = 50;

/// Hard cap imposed by the platform on one history request.
pub const MAX_PAGE_SIZE: i32 = 100;

/// A single decoded message. Immutable once produced by the fetcher.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: i32,
    pub date: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub sender_id: i64,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub sender_name: String,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply_to_id: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media: Option<MediaInfo>,
    /// URLs extracted from link entities, in entity order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub entities: Vec<String>,
}

fn is_zero(v: &i64) -> bool {
    *v == 0
}

impl Message {
    /// True when the message carries a non-empty text body.
    pub fn has_text(&self) -> bool {
        !self.text.is_empty()
    }
}

/// Media attached to a message. Classified by variant only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaInfo {
    #[serde(rename = "type")]
    pub kind: MediaKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl MediaInfo {
    pub fn of_kind(kind: MediaKind) -> Self {
        Self {
            kind,
            width: None,
            height: None,
            file_name: None,
            url: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Photo,
    Document,
    Geo,
    Contact,
    Webpage,
    Venue,
    Poll,
    Dice,
    Other,
}

/// Options for a single page request and for multi-page pagination.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchOptions {
    /// Page size. Values <= 0 fall back to the default; values above 100 are capped.
    pub limit: i32,
    /// Message id cursor; the platform returns messages older than this id.
    pub offset_id: i32,
    /// Timestamp cursor; the platform returns messages strictly before it.
    pub offset_date: Option<DateTime<Utc>>,
    /// Inclusive lower date bound (pagination only).
    pub min_date: Option<DateTime<Utc>>,
    /// Inclusive upper date bound (pagination only).
    pub max_date: Option<DateTime<Utc>>,
    pub unread_only: bool,
    /// Stop after collecting this many messages. 0 = unbounded.
    pub max_count: usize,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            limit: DEFAULT_PAGE_SIZE,
            offset_id: 0,
            offset_date: None,
            min_date: None,
            max_date: None,
            unread_only: false,
            max_count: 0,
        }
    }
}

impl FetchOptions {
    /// Page size actually sent to the platform.
    pub fn effective_limit(&self) -> i32 {
        if self.limit <= 0 {
            DEFAULT_PAGE_SIZE
        } else {
            self.limit.min(MAX_PAGE_SIZE)
        }
    }
}

/// Messages plus lookup caches returned by one page or a merged pagination run.
///
/// Messages are in platform order (newest first).
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FetchResult {
    pub chat_id: i64,
    pub messages: Vec<Message>,
    /// Sender id -> display name.
    #[serde(skip)]
    pub users: HashMap<i64, String>,
    /// Chat/channel id -> title.
    #[serde(skip)]
    pub chats: HashMap<i64, String>,
    pub count: usize,
    pub has_more: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_id: Option<i32>,
    /// Platform-reported total for the chat, when known.
    #[serde(skip)]
    pub total: usize,
}

impl FetchResult {
    pub fn empty(chat_id: i64) -> Self {
        Self {
            chat_id,
            ..Self::default()
        }
    }

    /// Earliest timestamp on this page, if any.
    pub fn earliest_date(&self) -> Option<DateTime<Utc>> {
        self.messages.iter().map(|m| m.date).min()
    }
}

/// Progress of a pagination run, reported once per page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageProgress {
    /// 1-based page number.
    pub page: usize,
    /// Messages collected so far across all pages.
    pub collected: usize,
    /// Earliest timestamp seen on this page; `None` for an empty page.
    pub earliest: Option<DateTime<Utc>>,
}

/// A non-empty, chronologically ordered group of messages submitted to a provider together.
#[derive(Debug, Clone, PartialEq)]
pub struct Batch(Vec<Message>);

impl Batch {
    /// Wraps `messages` into a batch. Returns `None` for an empty list.
    pub fn new(messages: Vec<Message>) -> Option<Self> {
        if messages.is_empty() {
            None
        } else {
            Some(Self(messages))
        }
    }

    pub fn messages(&self) -> &[Message] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Always false; kept for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_messages(self) -> Vec<Message> {
        self.0
    }
}

/// Progress notification payload delivered to a `ProgressSink`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressEvent {
    pub progress: f64,
    pub total: f64,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress_token: Option<String>,
}
