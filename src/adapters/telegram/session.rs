//! Session file and client bootstrap.
//!
//! Login is out of scope: the client reuses an existing grammers session (SQLite file) and
//! refuses to run when that session is not authorized.

use crate::domain::DomainError;
use grammers_client::{Client, SenderPool};
use grammers_session::storages::SqliteSession;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// Opens the session storage at `path`, creating parent directories as needed.
///
/// # Errors
///
/// Returns an error if the directory cannot be created or the SQLite file cannot be opened.
pub async fn open_file_session(path: impl AsRef<Path>) -> anyhow::Result<SqliteSession> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| anyhow::anyhow!("create session directory: {}", e))?;
    }
    SqliteSession::open(path)
        .await
        .map_err(|e| anyhow::anyhow!("open session file: {}", e))
}

/// Start a client on the session at `session_path`. The sender pool runs on its own task.
pub async fn connect(api_id: i32, session_path: &Path) -> anyhow::Result<Client> {
    if api_id == 0 {
        anyhow::bail!(
            "Set TG_DIGEST_API_ID (or TELEGRAM_API_ID) in .env. Get it from https://my.telegram.org"
        );
    }

    let session = Arc::new(open_file_session(session_path).await?);
    let pool = SenderPool::new(session, api_id);
    let handle = pool.handle.clone();
    tokio::spawn(async move {
        pool.runner.run().await;
    });
    info!(path = %session_path.display(), "telegram session opened");

    Ok(Client::new(handle))
}

/// Fails unless the session already carries an authorized login.
pub async fn ensure_authorized(client: &Client) -> Result<(), DomainError> {
    let authorized = client
        .is_authorized()
        .await
        .map_err(|e| DomainError::upstream("checking authorization", e))?;
    if authorized {
        Ok(())
    } else {
        Err(DomainError::Config(
            "session is not authorized; log in with a Telegram client that writes this session file first"
                .to_string(),
        ))
    }
}
