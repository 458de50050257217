//! Map raw history responses to domain entities.
//!
//! Builds the user/chat name tables, decodes each record and derives the page cursor.

use crate::domain::text::extract_utf16_substring;
use crate::domain::{FetchResult, MediaInfo, MediaKind, Message};
use chrono::{DateTime, Utc};
use grammers_client::tl;
use std::collections::HashMap;

const UNKNOWN_SENDER: &str = "Unknown";

/// Who a record is attributed to, before the name lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SenderRef {
    User(i64),
    /// Basic group or channel; both names live in the chat table.
    Chat(i64),
}

impl SenderRef {
    pub fn from_peer(peer: &tl::enums::Peer) -> Self {
        match peer {
            tl::enums::Peer::User(u) => Self::User(u.user_id),
            tl::enums::Peer::Chat(c) => Self::Chat(c.chat_id),
            tl::enums::Peer::Channel(c) => Self::Chat(c.channel_id),
        }
    }

    pub fn from_input_peer(peer: &tl::enums::InputPeer) -> Option<Self> {
        match peer {
            tl::enums::InputPeer::User(u) => Some(Self::User(u.user_id)),
            tl::enums::InputPeer::UserFromMessage(u) => Some(Self::User(u.user_id)),
            tl::enums::InputPeer::Chat(c) => Some(Self::Chat(c.chat_id)),
            tl::enums::InputPeer::Channel(c) => Some(Self::Chat(c.channel_id)),
            tl::enums::InputPeer::ChannelFromMessage(c) => Some(Self::Chat(c.channel_id)),
            _ => None,
        }
    }

    /// `(id, display name)`; unknown names become "Unknown".
    pub fn lookup(
        self,
        users: &HashMap<i64, String>,
        chats: &HashMap<i64, String>,
    ) -> (i64, String) {
        let (id, name) = match self {
            Self::User(id) => (id, users.get(&id)),
            Self::Chat(id) => (id, chats.get(&id)),
        };
        let name = name
            .filter(|n| !n.is_empty())
            .cloned()
            .unwrap_or_else(|| UNKNOWN_SENDER.to_string());
        (id, name)
    }
}

/// `@username`, else "First Last", else `User#<id>`.
pub fn user_display_name(
    id: i64,
    username: Option<&str>,
    first_name: Option<&str>,
    last_name: Option<&str>,
) -> String {
    if let Some(username) = username.filter(|u| !u.is_empty()) {
        return format!("@{}", username);
    }
    let mut name = first_name.unwrap_or_default().to_string();
    if let Some(last) = last_name.filter(|l| !l.is_empty()) {
        if !name.is_empty() {
            name.push(' ');
        }
        name.push_str(last);
    }
    if name.is_empty() {
        format!("User#{}", id)
    } else {
        name
    }
}

/// Width/height of the widest size, if any size carries dimensions.
pub fn largest_dimensions(sizes: impl IntoIterator<Item = (i32, i32)>) -> Option<(i32, i32)> {
    sizes
        .into_iter()
        .fold(None, |best: Option<(i32, i32)>, (w, h)| match best {
            Some((bw, _)) if bw >= w => best,
            _ if w > 0 => Some((w, h)),
            _ => best,
        })
}

/// Id of any raw record, service and empty placeholders included.
fn record_id(record: &tl::enums::Message) -> i32 {
    match record {
        tl::enums::Message::Message(m) => m.id,
        tl::enums::Message::Service(m) => m.id,
        tl::enums::Message::Empty(m) => m.id,
    }
}

/// Fill in `count` / `total` / `has_more` / `next_id`.
///
/// The cursor follows the raw records, so a page made only of skipped records still points
/// at the next page instead of looking like the end of history.
pub fn apply_page_cursor(
    result: &mut FetchResult,
    records: &[tl::enums::Message],
    reported_total: Option<i32>,
) {
    let raw_len = records.len();
    result.count = result.messages.len();
    result.total = reported_total
        .map(|t| t.max(0) as usize)
        .unwrap_or(raw_len);
    result.has_more = raw_len > 0 && raw_len < result.total;
    result.next_id = records.last().map(record_id);
}

/// Decode a `messages.getHistory` response.
///
/// `peer` is the chat the page came from; records without `from_id` are attributed to it.
pub fn history_to_domain(
    raw: tl::enums::messages::Messages,
    chat_id: i64,
    peer: &tl::enums::InputPeer,
) -> FetchResult {
    use tl::enums::messages::Messages;

    let (messages, users, chats, reported_total) = match raw {
        Messages::Messages(m) => (m.messages, m.users, m.chats, None),
        Messages::Slice(m) => (m.messages, m.users, m.chats, Some(m.count)),
        Messages::ChannelMessages(m) => (m.messages, m.users, m.chats, Some(m.count)),
        Messages::NotModified(_) => return FetchResult::empty(chat_id),
    };
    decode_records(chat_id, &messages, &users, &chats, reported_total, peer)
}

fn decode_records(
    chat_id: i64,
    records: &[tl::enums::Message],
    users: &[tl::enums::User],
    chats: &[tl::enums::Chat],
    reported_total: Option<i32>,
    peer: &tl::enums::InputPeer,
) -> FetchResult {
    let mut result = FetchResult::empty(chat_id);
    for user in users {
        if let tl::enums::User::User(u) = user {
            result.users.insert(
                u.id,
                user_display_name(
                    u.id,
                    u.username.as_deref(),
                    u.first_name.as_deref(),
                    u.last_name.as_deref(),
                ),
            );
        }
    }
    for chat in chats {
        match chat {
            tl::enums::Chat::Chat(c) => {
                result.chats.insert(c.id, c.title.clone());
            }
            tl::enums::Chat::Channel(c) => {
                result.chats.insert(c.id, c.title.clone());
            }
            _ => {}
        }
    }

    let fallback_sender = SenderRef::from_input_peer(peer);
    for raw_msg in records {
        // Service actions and empty placeholders are not part of the conversation.
        let tl::enums::Message::Message(m) = raw_msg else {
            continue;
        };
        result.messages.push(message_to_domain(
            m,
            fallback_sender,
            &result.users,
            &result.chats,
        ));
    }

    apply_page_cursor(&mut result, records, reported_total);
    result
}

/// Sender of a record: `from_id` when present, else the chat itself.
fn resolve_sender(
    from_id: Option<&tl::enums::Peer>,
    fallback: Option<SenderRef>,
    users: &HashMap<i64, String>,
    chats: &HashMap<i64, String>,
) -> (i64, String) {
    match from_id.map(SenderRef::from_peer).or(fallback) {
        Some(s) => s.lookup(users, chats),
        None => (0, UNKNOWN_SENDER.to_string()),
    }
}

/// URLs carried by link entities, in entity order. Empty slices are dropped.
fn link_urls(text: &str, entities: &[tl::enums::MessageEntity]) -> Vec<String> {
    entities
        .iter()
        .filter_map(|entity| match entity {
            tl::enums::MessageEntity::Url(u) => {
                Some(extract_utf16_substring(text, u.offset, u.length)).filter(|s| !s.is_empty())
            }
            tl::enums::MessageEntity::TextUrl(t) => Some(t.url.clone()),
            _ => None,
        })
        .collect()
}

fn photo_dimensions(sizes: &[tl::enums::PhotoSize]) -> Option<(i32, i32)> {
    largest_dimensions(sizes.iter().filter_map(|size| match size {
        tl::enums::PhotoSize::Size(s) => Some((s.w, s.h)),
        tl::enums::PhotoSize::PhotoCachedSize(s) => Some((s.w, s.h)),
        tl::enums::PhotoSize::Progressive(s) => Some((s.w, s.h)),
        _ => None,
    }))
}

fn document_file_name(attributes: &[tl::enums::DocumentAttribute]) -> Option<String> {
    attributes.iter().find_map(|attr| match attr {
        tl::enums::DocumentAttribute::Filename(f) => Some(f.file_name.clone()),
        _ => None,
    })
}

fn message_to_domain(
    m: &tl::types::Message,
    fallback_sender: Option<SenderRef>,
    users: &HashMap<i64, String>,
    chats: &HashMap<i64, String>,
) -> Message {
    let (sender_id, sender_name) = resolve_sender(m.from_id.as_ref(), fallback_sender, users, chats);

    let reply_to_id = m.reply_to.as_ref().and_then(|r| match r {
        tl::enums::MessageReplyHeader::Header(h) => h.reply_to_msg_id,
        _ => None,
    });

    Message {
        id: m.id,
        date: DateTime::<Utc>::from_timestamp(m.date as i64, 0).unwrap_or_default(),
        sender_id,
        sender_name,
        text: m.message.clone(),
        reply_to_id,
        media: m.media.as_ref().map(media_to_domain),
        entities: link_urls(&m.message, m.entities.as_deref().unwrap_or_default()),
    }
}

fn media_to_domain(media: &tl::enums::MessageMedia) -> MediaInfo {
    use tl::enums::MessageMedia;

    match media {
        MessageMedia::Photo(p) => {
            let mut info = MediaInfo::of_kind(MediaKind::Photo);
            if let Some(tl::enums::Photo::Photo(photo)) = p.photo.as_ref() {
                if let Some((w, h)) = photo_dimensions(&photo.sizes) {
                    info.width = Some(w);
                    info.height = Some(h);
                }
            }
            info
        }
        MessageMedia::Document(d) => {
            let mut info = MediaInfo::of_kind(MediaKind::Document);
            if let Some(tl::enums::Document::Document(doc)) = d.document.as_ref() {
                info.file_name = document_file_name(&doc.attributes);
            }
            info
        }
        MessageMedia::WebPage(w) => {
            let mut info = MediaInfo::of_kind(MediaKind::Webpage);
            if let tl::enums::WebPage::Page(page) = &w.webpage {
                info.url = Some(page.url.clone());
            }
            info
        }
        MessageMedia::Geo(_) => MediaInfo::of_kind(MediaKind::Geo),
        MessageMedia::Contact(_) => MediaInfo::of_kind(MediaKind::Contact),
        MessageMedia::Venue(_) => MediaInfo::of_kind(MediaKind::Venue),
        MessageMedia::Poll(_) => MediaInfo::of_kind(MediaKind::Poll),
        MessageMedia::Dice(_) => MediaInfo::of_kind(MediaKind::Dice),
        _ => MediaInfo::of_kind(MediaKind::Other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::format::tests::msg;

    #[test]
    fn test_user_display_name_precedence() {
        assert_eq!(
            user_display_name(1, Some("alice"), Some("Alice"), Some("Smith")),
            "@alice"
        );
        assert_eq!(
            user_display_name(1, Some(""), Some("Alice"), Some("Smith")),
            "Alice Smith"
        );
        assert_eq!(user_display_name(1, None, Some("Alice"), None), "Alice");
        assert_eq!(user_display_name(1, None, None, Some("Smith")), "Smith");
        assert_eq!(user_display_name(77, None, None, None), "User#77");
    }

    #[test]
    fn test_sender_lookup_falls_back_to_unknown() {
        let users = HashMap::from([(5, "@bob".to_string())]);
        let chats = HashMap::from([(9, "Team".to_string())]);
        assert_eq!(
            SenderRef::User(5).lookup(&users, &chats),
            (5, "@bob".to_string())
        );
        assert_eq!(
            SenderRef::Chat(9).lookup(&users, &chats),
            (9, "Team".to_string())
        );
        assert_eq!(
            SenderRef::User(6).lookup(&users, &chats),
            (6, "Unknown".to_string())
        );
    }

    #[test]
    fn test_input_peer_sender() {
        let peer = tl::enums::InputPeer::Chat(tl::types::InputPeerChat { chat_id: 42 });
        assert_eq!(SenderRef::from_input_peer(&peer), Some(SenderRef::Chat(42)));
        assert_eq!(SenderRef::from_input_peer(&tl::enums::InputPeer::Empty), None);
    }

    #[test]
    fn test_largest_dimensions() {
        assert_eq!(
            largest_dimensions([(90, 60), (1280, 720), (320, 180)]),
            Some((1280, 720))
        );
        assert_eq!(largest_dimensions([(0, 0)]), None);
        assert_eq!(largest_dimensions(Vec::new()), None);
    }

    fn placeholder(id: i32) -> tl::enums::Message {
        tl::enums::Message::Empty(tl::types::MessageEmpty { id, peer_id: None })
    }

    fn url(offset: i32, length: i32) -> tl::enums::MessageEntity {
        tl::enums::MessageEntity::Url(tl::types::MessageEntityUrl { offset, length })
    }

    #[test]
    fn test_page_cursor_for_slice() {
        let mut result = FetchResult::empty(1);
        result.messages = vec![msg(30, 300, 1, "c"), msg(29, 290, 1, "b"), msg(28, 280, 1, "a")];
        let records = vec![placeholder(30), placeholder(29), placeholder(28)];
        apply_page_cursor(&mut result, &records, Some(500));
        assert_eq!(result.count, 3);
        assert_eq!(result.total, 500);
        assert!(result.has_more);
        assert_eq!(result.next_id, Some(28));
    }

    #[test]
    fn test_page_cursor_for_full_history() {
        let mut result = FetchResult::empty(1);
        result.messages = vec![msg(2, 20, 1, "b"), msg(1, 10, 1, "a")];
        apply_page_cursor(&mut result, &[placeholder(2), placeholder(1)], None);
        assert_eq!(result.total, 2);
        assert!(!result.has_more);

        let mut empty = FetchResult::empty(1);
        apply_page_cursor(&mut empty, &[], Some(10));
        assert!(!empty.has_more);
        assert_eq!(empty.next_id, None);
    }

    #[test]
    fn test_skipped_records_still_advance_cursor() {
        let peer = tl::enums::InputPeer::Chat(tl::types::InputPeerChat { chat_id: 42 });
        let records = vec![placeholder(80), placeholder(79), placeholder(78)];
        let page = decode_records(-42, &records, &[], &[], Some(300), &peer);

        assert_eq!(page.chat_id, -42);
        assert!(page.messages.is_empty());
        assert_eq!(page.count, 0);
        assert_eq!(page.total, 300);
        assert!(page.has_more);
        assert_eq!(page.next_id, Some(78));
    }

    #[test]
    fn test_not_modified_is_empty_page() {
        let raw = tl::enums::messages::Messages::NotModified(
            tl::types::messages::MessagesNotModified { count: 12 },
        );
        let page = history_to_domain(raw, 7, &tl::enums::InputPeer::Empty);
        assert_eq!(page, FetchResult::empty(7));
        assert!(!page.has_more);
        assert_eq!(page.next_id, None);
    }

    #[test]
    fn test_sender_falls_back_to_chat_peer() {
        let users = HashMap::from([(5, "@bob".to_string())]);
        let chats = HashMap::from([(42, "Release Notes".to_string())]);
        let channel = SenderRef::from_input_peer(&tl::enums::InputPeer::Chat(
            tl::types::InputPeerChat { chat_id: 42 },
        ));

        assert_eq!(
            resolve_sender(None, channel, &users, &chats),
            (42, "Release Notes".to_string())
        );
        let from = tl::enums::Peer::User(tl::types::PeerUser { user_id: 5 });
        assert_eq!(
            resolve_sender(Some(&from), channel, &users, &chats),
            (5, "@bob".to_string())
        );
        assert_eq!(
            resolve_sender(None, None, &users, &chats),
            (0, "Unknown".to_string())
        );
    }

    #[test]
    fn test_link_urls_slice_by_utf16_offsets() {
        // "😀 " is three UTF-16 units.
        let text = "😀 see https://a.example and docs";
        let entities = vec![
            tl::enums::MessageEntity::Bold(tl::types::MessageEntityBold { offset: 0, length: 2 }),
            url(7, 17),
            url(200, 5),
            tl::enums::MessageEntity::TextUrl(tl::types::MessageEntityTextUrl {
                offset: 29,
                length: 4,
                url: "https://docs.example".into(),
            }),
        ];
        assert_eq!(
            link_urls(text, &entities),
            vec!["https://a.example".to_string(), "https://docs.example".to_string()]
        );
        assert!(link_urls(text, &[]).is_empty());
    }

    #[test]
    fn test_photo_dimensions_pick_largest_size() {
        let sizes = vec![
            tl::enums::PhotoSize::Empty(tl::types::PhotoSizeEmpty { r#type: "s".into() }),
            tl::enums::PhotoSize::Size(tl::types::PhotoSize {
                r#type: "m".into(),
                w: 320,
                h: 240,
                size: 1_000,
            }),
            tl::enums::PhotoSize::Progressive(tl::types::PhotoSizeProgressive {
                r#type: "y".into(),
                w: 1280,
                h: 960,
                sizes: vec![1_000, 5_000],
            }),
            tl::enums::PhotoSize::PhotoCachedSize(tl::types::PhotoCachedSize {
                r#type: "x".into(),
                w: 800,
                h: 600,
                bytes: vec![],
            }),
        ];
        assert_eq!(photo_dimensions(&sizes), Some((1280, 960)));
        assert_eq!(photo_dimensions(&[]), None);
    }

    #[test]
    fn test_document_file_name() {
        let attrs = vec![
            tl::enums::DocumentAttribute::ImageSize(tl::types::DocumentAttributeImageSize {
                w: 10,
                h: 10,
            }),
            tl::enums::DocumentAttribute::Filename(tl::types::DocumentAttributeFilename {
                file_name: "report.pdf".into(),
            }),
        ];
        assert_eq!(document_file_name(&attrs), Some("report.pdf".into()));
        assert_eq!(document_file_name(&attrs[..1]), None);
    }
}
