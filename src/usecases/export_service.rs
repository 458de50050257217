//! Bulk export of a chat's history to a text file.
//!
//! Shares the pagination core with summarization; output is the delimited backup format in
//! platform order. Writes are confined to the configured allowed directories.

use crate::domain::format::format_batch_for_backup;
use crate::domain::{DomainError, FetchOptions, PageProgress};
use crate::ports::ProgressSink;
use crate::shared::{ProgressEstimator, ProgressMode, Tuning};
use crate::usecases::paginator::Paginator;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Messages exported when no count or date filter is given.
pub const DEFAULT_EXPORT_COUNT: usize = 1000;

const MAX_FILENAME_LEN: usize = 100;
const FILENAME_TIME_FORMAT: &str = "%Y-%m-%d_%H-%M-%S";

#[derive(Debug, Clone, Default)]
pub struct ExportRequest {
    pub chat_id: i64,
    /// Target file; generated inside the first allowed directory when absent.
    pub path: Option<PathBuf>,
    /// Maximum messages; 0 = no limit.
    pub count: usize,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub progress_token: Option<String>,
}

impl ExportRequest {
    /// Falls back to the last [`DEFAULT_EXPORT_COUNT`] messages when nothing bounds the export.
    pub fn effective_count(&self) -> usize {
        if self.count == 0 && self.from.is_none() && self.to.is_none() {
            DEFAULT_EXPORT_COUNT
        } else {
            self.count
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExportOutcome {
    pub path: PathBuf,
    pub messages: usize,
}

/// Parse `YYYY-MM-DD HH:MM:SS` or `YYYY-MM-DD` (UTC). Empty input means "not set".
pub fn parse_export_date(raw: &str) -> Result<Option<DateTime<Utc>>, DomainError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }
    if let Ok(t) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S") {
        return Ok(Some(t.and_utc()));
    }
    if let Ok(d) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Ok(d.and_hms_opt(0, 0, 0).map(|t| t.and_utc()));
    }
    Err(DomainError::InvalidInput(format!(
        "invalid date format {:?}, expected YYYY-MM-DD or YYYY-MM-DD HH:MM:SS",
        raw
    )))
}

/// Make `name` safe as a file name.
pub fn sanitize_filename(name: &str) -> String {
    let replaced: String = name
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' | '\n' | '\r' | '\t' => '_',
            c => c,
        })
        .collect();
    let mut out = replaced.trim_matches(|c| c == ' ' || c == '.').to_string();
    if out.len() > MAX_FILENAME_LEN {
        let mut cut = MAX_FILENAME_LEN;
        while !out.is_char_boundary(cut) {
            cut -= 1;
        }
        out.truncate(cut);
    }
    if out.is_empty() {
        "backup".to_string()
    } else {
        out
    }
}

/// Absolute, lexically normalized form of `path` (`.` and `..` folded, no symlink lookup).
fn normalize(path: &Path) -> Result<PathBuf, DomainError> {
    let abs = std::path::absolute(path)
        .map_err(|e| DomainError::InvalidInput(format!("resolving path {}: {}", path.display(), e)))?;
    let mut out = PathBuf::new();
    for component in abs.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other),
        }
    }
    Ok(out)
}

/// Ok when `target` lies inside one of `allowed`.
pub fn is_path_allowed(target: &Path, allowed: &[PathBuf]) -> Result<(), DomainError> {
    let target_abs = normalize(target)?;
    let inside = allowed
        .iter()
        .filter_map(|dir| normalize(dir).ok())
        .any(|dir| target_abs.starts_with(&dir));
    if inside {
        Ok(())
    } else {
        Err(DomainError::InvalidInput(format!(
            "path {:?} is not within allowed directories; configure TG_DIGEST_ALLOWED_PATHS",
            target.display().to_string()
        )))
    }
}

pub struct ExportService {
    paginator: Arc<Paginator>,
    allowed_paths: Vec<PathBuf>,
    tuning: Tuning,
}

impl ExportService {
    pub fn new(paginator: Arc<Paginator>, allowed_paths: Vec<PathBuf>, tuning: Tuning) -> Self {
        Self {
            paginator,
            allowed_paths,
            tuning,
        }
    }

    pub fn allowed_paths(&self) -> &[PathBuf] {
        &self.allowed_paths
    }

    async fn target_path(&self, req: &ExportRequest) -> Result<PathBuf, DomainError> {
        if let Some(path) = &req.path {
            return Ok(path.clone());
        }
        let dir = self
            .allowed_paths
            .first()
            .ok_or_else(|| DomainError::Config("no allowed paths configured for export".into()))?;
        let chat_name = self
            .paginator
            .chat_name(req.chat_id)
            .await?
            .unwrap_or_else(|| format!("chat_{}", req.chat_id));
        Ok(dir.join(format!(
            "{}-{}.txt",
            sanitize_filename(&chat_name),
            Utc::now().format(FILENAME_TIME_FORMAT)
        )))
    }

    /// Fetch the requested slice of history and write it to disk.
    pub async fn export(
        &self,
        req: &ExportRequest,
        sink: Arc<dyn ProgressSink>,
        cancel: &CancellationToken,
    ) -> Result<ExportOutcome, DomainError> {
        let count = req.effective_count();
        let path = self.target_path(req).await?;
        is_path_allowed(&path, &self.allowed_paths)?;

        let estimator = ProgressEstimator::new(
            ProgressMode::for_window(req.from, req.to, count, Utc::now()),
            sink,
            req.progress_token.clone(),
            self.tuning.heartbeat_interval,
        );
        estimator.start();

        let opts = FetchOptions {
            limit: self.tuning.export_page_size,
            min_date: req.from,
            max_date: req.to,
            max_count: count,
            ..FetchOptions::default()
        };
        let mut on_page = |p: PageProgress| {
            estimator.set_message(format!(
                "Fetching messages (batch {}, {} messages so far)...",
                p.page, p.collected
            ));
            estimator.set_collected(p.collected);
            if let Some(t) = p.earliest {
                estimator.observe_earliest(t);
            }
        };
        let fetched = self
            .paginator
            .fetch_all(req.chat_id, &opts, Some(&mut on_page), cancel)
            .await;
        let result = match fetched {
            Ok(result) => result,
            Err(e) => {
                estimator.stop();
                return Err(e.into_error().context("getting messages"));
            }
        };
        estimator.send(format!("Collected {} messages", result.messages.len()));
        estimator.stop();

        let content = format_batch_for_backup(&result.messages);
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| DomainError::Export(format!("create directory {}: {}", parent.display(), e)))?;
        }
        tokio::fs::write(&path, content)
            .await
            .map_err(|e| DomainError::Export(format!("write {}: {}", path.display(), e)))?;

        let path = normalize(&path)?;
        info!(
            chat_id = req.chat_id,
            messages = result.messages.len(),
            path = %path.display(),
            "export written"
        );
        Ok(ExportOutcome {
            path,
            messages: result.messages.len(),
        })
    }
}
