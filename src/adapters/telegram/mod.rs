//! Telegram adapter (grammers). Peer resolution, paged history, record mapping, session file.

pub mod client;
pub mod mapper;
pub mod peer;
pub mod session;

pub use client::GrammersMessageSource;
pub use peer::{DialogPeerResolver, ResolvedPeer};
