//! Chat id to `InputPeer` resolution over the account's dialog list.

use crate::domain::DomainError;
use crate::ports::PeerResolver;
use async_trait::async_trait;
use grammers_client::tl;
use grammers_client::Client;
use std::collections::HashMap;
use tokio::sync::Mutex;
use tracing::debug;

const OP: &str = "resolving peer";

/// A resolved chat: the handle used in requests plus its display name.
#[derive(Debug, Clone)]
pub struct ResolvedPeer {
    pub input: tl::enums::InputPeer,
    pub name: Option<String>,
}

/// Scans dialogs to find a chat by its bot-API style id (`-100…` for channels).
///
/// Results are cached per chat id so repeated fetches do not hit getDialogs again (which is
/// what triggers FLOOD_WAIT on large accounts).
pub struct DialogPeerResolver {
    client: Client,
    cache: Mutex<HashMap<i64, ResolvedPeer>>,
}

impl DialogPeerResolver {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            cache: Mutex::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl PeerResolver for DialogPeerResolver {
    type Peer = ResolvedPeer;

    async fn resolve(&self, chat_id: i64) -> Result<ResolvedPeer, DomainError> {
        if let Some(hit) = self.cache.lock().await.get(&chat_id) {
            return Ok(hit.clone());
        }

        let mut dialogs = self.client.iter_dialogs();
        let mut found = None;
        while let Some(dialog) = dialogs.next().await.map_err(|e| DomainError::peer(OP, e))? {
            let peer = dialog.peer();
            if peer.id().bot_api_dialog_id() == Some(chat_id) {
                found = Some(peer.clone());
                break;
            }
        }
        let peer = found
            .ok_or_else(|| DomainError::peer(OP, format!("chat {} not found in dialogs", chat_id)))?;

        let name = peer.name().map(String::from);
        let peer_ref = peer
            .to_ref()
            .await
            .map_err(|e| DomainError::peer(OP, e))?
            .ok_or_else(|| DomainError::peer(OP, "peer not in session cache"))?;
        let resolved = ResolvedPeer {
            input: peer_ref.into(),
            name,
        };
        debug!(chat_id, "peer resolved from dialogs");

        self.cache.lock().await.insert(chat_id, resolved.clone());
        Ok(resolved)
    }
}
