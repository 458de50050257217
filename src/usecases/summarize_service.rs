//! Rolling summarization of a chat window.
//!
//! Fetch → chronological order → text-only → token-bounded batches → one provider call per
//! batch, each prompt carrying the summary produced so far. While a provider call is in
//! flight a heartbeat keeps the caller informed.

use crate::domain::batching::split_into_batches_by_tokens;
use crate::domain::format::{filter_text_only, format_batch_for_summary, into_chronological};
use crate::domain::{DomainError, FetchOptions, Message, PageProgress, ProgressEvent};
use crate::ports::{ProgressSink, SummaryProvider};
use crate::shared::progress::heartbeat_period;
use crate::shared::{ProgressEstimator, ProgressMode, Tuning};
use crate::usecases::paginator::Paginator;
use chrono::{DateTime, Duration as ChronoDuration, NaiveDate, Utc};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

pub const NO_MESSAGES: &str = "No messages found in the specified period.";
pub const NO_TEXT_MESSAGES: &str = "No text messages found in the specified period.";

const PROMPT_TEMPLATE: &str = "You are summarizing a Telegram chat conversation.

User's goal for this summary:
{goal}

Current summary so far:
{summary}

New messages to incorporate:
{messages}

Instructions:
- Focus on information relevant to the user's goal
- Identify key topics and themes discussed
- Note important decisions or conclusions
- Highlight action items if any
- Keep the summary concise but comprehensive
- Write in the same language as the messages
- Output as plain text (markdown allowed)

Updated summary:";

fn build_prompt(goal: &str, summary: &str, messages: &str) -> String {
    PROMPT_TEMPLATE
        .replace("{goal}", goal)
        .replace("{summary}", summary)
        .replace("{messages}", messages)
}

/// Start of the summarization window.
///
/// `since` wins over `period` and accepts `YYYY-MM-DD` (midnight UTC) or RFC 3339.
/// `period` is `day`, `week` or `month` (the default), counted back from `now`.
pub fn resolve_since(
    period: Option<&str>,
    since: Option<&str>,
    now: DateTime<Utc>,
) -> Result<DateTime<Utc>, DomainError> {
    if let Some(raw) = since.map(str::trim).filter(|s| !s.is_empty()) {
        if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
            return Ok(date.and_hms_opt(0, 0, 0).unwrap_or_default().and_utc());
        }
        return DateTime::parse_from_rfc3339(raw)
            .map(|t| t.with_timezone(&Utc))
            .map_err(|_| {
                DomainError::InvalidInput(
                    "invalid since format, use ISO 8601 (e.g. '2024-01-15' or '2024-01-15T00:00:00Z')"
                        .to_string(),
                )
            });
    }

    let days = match period.map(str::trim).filter(|p| !p.is_empty()).unwrap_or("month") {
        "day" => 1,
        "week" => 7,
        "month" => 30,
        other => {
            return Err(DomainError::InvalidInput(format!(
                "invalid period: {} (use 'day', 'week', or 'month')",
                other
            )));
        }
    };
    Ok(now - ChronoDuration::days(days))
}

#[derive(Debug, Clone)]
pub struct SummarizeRequest {
    pub chat_id: i64,
    /// What the caller wants out of the summary.
    pub goal: String,
    pub since: DateTime<Utc>,
    /// Echoed back on every progress event.
    pub progress_token: Option<String>,
}

pub struct RollingSummarizer {
    paginator: Arc<Paginator>,
    provider: Arc<dyn SummaryProvider>,
    tuning: Tuning,
}

impl RollingSummarizer {
    pub fn new(paginator: Arc<Paginator>, provider: Arc<dyn SummaryProvider>, tuning: Tuning) -> Self {
        Self {
            paginator,
            provider,
            tuning,
        }
    }

    pub fn provider_name(&self) -> &'static str {
        self.provider.name()
    }

    /// Summarize `req.chat_id` from `req.since` until now.
    ///
    /// Returns a fixed notice without calling the provider when the window holds no messages
    /// or no text messages. A provider failure aborts the run.
    pub async fn summarize(
        &self,
        req: &SummarizeRequest,
        sink: Arc<dyn ProgressSink>,
        cancel: &CancellationToken,
    ) -> Result<String, DomainError> {
        let messages = self.fetch_window(req, Arc::clone(&sink), cancel).await?;
        info!(
            chat_id = req.chat_id,
            fetched = messages.len(),
            provider = self.provider.name(),
            "starting rolling summarization"
        );
        if messages.is_empty() {
            return Ok(NO_MESSAGES.to_string());
        }

        let messages = filter_text_only(into_chronological(messages));
        if messages.is_empty() {
            return Ok(NO_TEXT_MESSAGES.to_string());
        }

        let batches = split_into_batches_by_tokens(messages, self.tuning.batch_tokens);
        let total = batches.len();
        let mut running = String::new();

        for (i, batch) in batches.iter().enumerate() {
            let current = i + 1;
            sink.notify(batch_event(
                current,
                total,
                format!("Processing batch {}/{}", current, total),
                &req.progress_token,
            ));

            let prompt = build_prompt(
                &req.goal,
                &running,
                &format_batch_for_summary(batch.messages()),
            );
            let summary = self
                .summarize_with_heartbeat(prompt, current, total, &req.progress_token, &sink, cancel)
                .await
                .map_err(|e| e.context(format!("summarizing batch {}", current)))?;
            running = summary.trim().to_string();
        }

        info!(chat_id = req.chat_id, batches = total, "rolling summarization complete");
        Ok(running)
    }

    async fn fetch_window(
        &self,
        req: &SummarizeRequest,
        sink: Arc<dyn ProgressSink>,
        cancel: &CancellationToken,
    ) -> Result<Vec<Message>, DomainError> {
        let estimator = ProgressEstimator::new(
            ProgressMode::date_coverage(Some(req.since), None, Utc::now()),
            sink,
            req.progress_token.clone(),
            self.tuning.heartbeat_interval,
        );
        estimator.start();

        let opts = FetchOptions {
            limit: self.tuning.summary_page_size,
            min_date: Some(req.since),
            ..FetchOptions::default()
        };
        let mut on_page = |p: PageProgress| {
            if let Some(t) = p.earliest {
                estimator.observe_earliest(t);
            }
            estimator.set_collected(p.collected);
            let msg = format!("Fetched {} messages", p.collected);
            estimator.set_message(msg.clone());
            estimator.send(msg);
        };
        let fetched = self
            .paginator
            .fetch_all(req.chat_id, &opts, Some(&mut on_page), cancel)
            .await;
        estimator.stop();

        fetched
            .map(|r| r.messages)
            .map_err(|e| e.into_error().context("fetching messages"))
    }

    /// Run one provider call on its own task, emitting a heartbeat until it finishes.
    ///
    /// Caller cancellation cancels the provider's token and aborts the task.
    async fn summarize_with_heartbeat(
        &self,
        prompt: String,
        current: usize,
        total: usize,
        token: &Option<String>,
        sink: &Arc<dyn ProgressSink>,
        cancel: &CancellationToken,
    ) -> Result<String, DomainError> {
        let provider_cancel = cancel.child_token();
        let provider = Arc::clone(&self.provider);
        let task_cancel = provider_cancel.clone();
        let mut call =
            tokio::spawn(async move { provider.summarize(&prompt, &task_cancel).await });

        let period = heartbeat_period(self.tuning.heartbeat_interval);
        let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
        let mut ticks: u32 = 0;

        loop {
            tokio::select! {
                joined = &mut call => {
                    return joined.unwrap_or_else(|e| {
                        Err(DomainError::provider(
                            self.provider.name(),
                            format!("provider task failed: {}", e),
                        ))
                    });
                }
                _ = ticker.tick() => {
                    ticks += 1;
                    let elapsed = (period * ticks).as_secs();
                    sink.notify(batch_event(
                        current,
                        total,
                        format!("Processing batch {}/{} ({}s elapsed)", current, total, elapsed),
                        token,
                    ));
                }
                _ = cancel.cancelled() => {
                    warn!(batch = current, "summarization cancelled while waiting for provider");
                    provider_cancel.cancel();
                    call.abort();
                    return Err(DomainError::cancelled("waiting for provider"));
                }
            }
        }
    }
}

fn batch_event(current: usize, total: usize, message: String, token: &Option<String>) -> ProgressEvent {
    ProgressEvent {
        progress: current as f64,
        total: total as f64,
        message,
        progress_token: token.clone(),
    }
}
