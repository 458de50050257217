//! Implements MessageSource using grammers Client.
//!
//! One `messages.getHistory` call per page, throttled through the shared rate limiter.
//! Flood waits are surfaced as upstream errors; nothing here retries.

use crate::adapters::telegram::mapper;
use crate::adapters::telegram::peer::{DialogPeerResolver, ResolvedPeer};
use crate::domain::{DomainError, FetchOptions, FetchResult};
use crate::ports::{MessageSource, PeerResolver};
use crate::shared::RateLimiter;
use async_trait::async_trait;
use grammers_client::tl;
use grammers_client::Client;
use std::sync::Arc;
use tracing::debug;

/// Telegram history adapter. Shares the grammers client (and session) with the resolver.
pub struct GrammersMessageSource {
    client: Client,
    resolver: Arc<DialogPeerResolver>,
    limiter: RateLimiter,
}

impl GrammersMessageSource {
    pub fn new(client: Client, resolver: Arc<DialogPeerResolver>, limiter: RateLimiter) -> Self {
        Self {
            client,
            resolver,
            limiter,
        }
    }

    /// Highest incoming message id the account has read in this chat (0 when unknown).
    async fn read_inbox_max_id(&self, peer: &tl::enums::InputPeer) -> Result<i32, DomainError> {
        use tl::enums::messages::PeerDialogs;

        let req = tl::functions::messages::GetPeerDialogs {
            peers: vec![tl::enums::InputDialogPeer::Peer(tl::types::InputDialogPeer {
                peer: peer.clone(),
            })],
        };
        let PeerDialogs::Dialogs(dialogs) = self
            .client
            .invoke(&req)
            .await
            .map_err(|e| DomainError::upstream("getting read inbox max id", e))?;

        Ok(match dialogs.dialogs.first() {
            Some(tl::enums::Dialog::Dialog(d)) => d.read_inbox_max_id,
            _ => 0,
        })
    }

    async fn history_page(
        &self,
        chat_id: i64,
        peer: &ResolvedPeer,
        opts: &FetchOptions,
    ) -> Result<FetchResult, DomainError> {
        let min_id = if opts.unread_only {
            self.read_inbox_max_id(&peer.input).await?
        } else {
            0
        };

        let req = tl::functions::messages::GetHistory {
            peer: peer.input.clone(),
            offset_id: opts.offset_id,
            offset_date: opts
                .offset_date
                .map(|d| d.timestamp().clamp(0, i32::MAX as i64) as i32)
                .unwrap_or(0),
            add_offset: 0,
            limit: opts.effective_limit(),
            max_id: 0,
            min_id,
            hash: 0,
        };

        self.limiter.acquire().await;

        let raw = self
            .client
            .invoke(&req)
            .await
            .map_err(|e| DomainError::upstream("getting messages", e))?;
        let page = mapper::history_to_domain(raw, chat_id, &peer.input);

        debug!(
            chat_id,
            offset_id = opts.offset_id,
            fetched = page.count,
            total = page.total,
            has_more = page.has_more,
            "history page fetched"
        );
        Ok(page)
    }
}

#[async_trait]
impl MessageSource for GrammersMessageSource {
    async fn fetch_page(
        &self,
        chat_id: i64,
        opts: &FetchOptions,
    ) -> Result<FetchResult, DomainError> {
        let peer = self.resolver.resolve(chat_id).await?;
        self.history_page(chat_id, &peer, opts).await
    }

    async fn chat_name(&self, chat_id: i64) -> Result<Option<String>, DomainError> {
        Ok(self.resolver.resolve(chat_id).await?.name)
    }
}
