//! Implements InputPort. Inquire-based interactive menu.
//!
//! Prompts are blocking; long operations run with Ctrl-C wired to their cancellation token.

use crate::adapters::ai::ProviderName;
use crate::adapters::ui::banner::{CYBER_GREEN, NEON_PURPLE};
use crate::adapters::ui::progress::BarProgressSink;
use crate::domain::DomainError;
use crate::ports::{InputPort, ProgressSink, TracingProgressSink};
use crate::usecases::export_service::parse_export_date;
use crate::usecases::{ExportRequest, ExportService, RollingSummarizer, SummarizeRequest, resolve_since};
use async_trait::async_trait;
use chrono::Utc;
use inquire::error::InquireError;
use inquire::ui::{Color, RenderConfig, Styled};
use inquire::{CustomType, Select, Text};
use std::fmt;
use std::future::Future;
use std::io::IsTerminal;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

const DEFAULT_GOAL: &str = "key decisions, action items and open questions";

const MOCK_NOTICE: &str = "Note: no summary provider is configured, this is placeholder output. \
Set TG_DIGEST_PROVIDER (ollama, gemini, anthropic or openai) for a real digest.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MenuAction {
    Summarize,
    Export,
    Exit,
}

impl fmt::Display for MenuAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            MenuAction::Summarize => "Summarize a chat",
            MenuAction::Export => "Export chat history to a file",
            MenuAction::Exit => "Exit",
        };
        f.write_str(label)
    }
}

/// Applies the neon palette to every inquire prompt.
pub fn apply_theme() {
    let purple = Color::Rgb {
        r: NEON_PURPLE.0,
        g: NEON_PURPLE.1,
        b: NEON_PURPLE.2,
    };
    let green = Color::Rgb {
        r: CYBER_GREEN.0,
        g: CYBER_GREEN.1,
        b: CYBER_GREEN.2,
    };
    let config = RenderConfig::default()
        .with_prompt_prefix(Styled::new("»").with_fg(purple))
        .with_highlighted_option_prefix(Styled::new("›").with_fg(green))
        .with_answered_prompt_prefix(Styled::new("✓").with_fg(green));
    inquire::set_global_render_config(config);
}

/// Escape and Ctrl-C at a prompt surface as `None` (back to the menu).
fn prompt_answer<T>(res: Result<T, InquireError>) -> Result<Option<T>, DomainError> {
    match res {
        Ok(v) => Ok(Some(v)),
        Err(InquireError::OperationCanceled | InquireError::OperationInterrupted) => Ok(None),
        Err(e) => Err(DomainError::InvalidInput(e.to_string())),
    }
}

/// Runs `fut` with Ctrl-C cancelling `cancel`.
async fn with_ctrl_c<F, T>(cancel: &CancellationToken, fut: F) -> T
where
    F: Future<Output = T>,
{
    let watcher = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                cancel.cancel();
            }
        })
    };
    let out = fut.await;
    watcher.abort();
    out
}

/// Text shown for a finished digest. Placeholder output from the mock provider is labelled.
fn digest_output(provider: &str, digest: &str) -> String {
    if provider == ProviderName::Mock.as_str() {
        format!("\n{}\n\n{}\n", digest, MOCK_NOTICE)
    } else {
        format!("\n{}\n", digest)
    }
}

/// A progress bar on a terminal, log lines otherwise. The bar is returned so it can be cleared.
fn progress_sink() -> (Arc<dyn ProgressSink>, Option<Arc<BarProgressSink>>) {
    if std::io::stdout().is_terminal() {
        let bar = Arc::new(BarProgressSink::new());
        let sink: Arc<dyn ProgressSink> = bar.clone();
        (sink, Some(bar))
    } else {
        let sink: Arc<dyn ProgressSink> = Arc::new(TracingProgressSink);
        (sink, None)
    }
}

fn optional(raw: String) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// TUI adapter. Inquire prompts.
pub struct TuiInputPort {
    summarizer: Arc<RollingSummarizer>,
    exporter: Arc<ExportService>,
}

impl TuiInputPort {
    pub fn new(summarizer: Arc<RollingSummarizer>, exporter: Arc<ExportService>) -> Self {
        Self {
            summarizer,
            exporter,
        }
    }

    async fn run_summarize(&self) -> Result<(), DomainError> {
        let Some(chat_id) = prompt_answer(
            CustomType::<i64>::new("Chat id:")
                .with_help_message("Bot API style id, e.g. -1001234567890 for a channel")
                .prompt(),
        )?
        else {
            return Ok(());
        };
        let Some(goal) = prompt_answer(
            Text::new("What should the digest focus on?")
                .with_default(DEFAULT_GOAL)
                .prompt(),
        )?
        else {
            return Ok(());
        };
        let Some(period) =
            prompt_answer(Select::new("Period:", vec!["day", "week", "month", "custom date"]).prompt())?
        else {
            return Ok(());
        };
        let since_raw = if period == "custom date" {
            match prompt_answer(
                Text::new("Since (YYYY-MM-DD or RFC 3339):").prompt(),
            )? {
                Some(raw) => optional(raw),
                None => return Ok(()),
            }
        } else {
            None
        };
        let since = resolve_since(Some(period), since_raw.as_deref(), Utc::now())?;

        let req = SummarizeRequest {
            chat_id,
            goal,
            since,
            progress_token: None,
        };
        info!(
            chat_id,
            since = %since,
            provider = self.summarizer.provider_name(),
            "summarizing chat"
        );

        let (sink, bar) = progress_sink();
        let cancel = CancellationToken::new();
        let res = with_ctrl_c(&cancel, self.summarizer.summarize(&req, sink, &cancel)).await;
        if let Some(bar) = bar {
            bar.finish();
        }

        let digest = res?;
        println!("{}", digest_output(self.summarizer.provider_name(), &digest));
        Ok(())
    }

    async fn run_export(&self) -> Result<(), DomainError> {
        let Some(chat_id) = prompt_answer(CustomType::<i64>::new("Chat id:").prompt())? else {
            return Ok(());
        };
        let hint = self
            .exporter
            .allowed_paths()
            .first()
            .map(|p| format!("Empty = generated file in {}", p.display()))
            .unwrap_or_else(|| "Absolute path to the output file".to_string());
        let Some(path) = prompt_answer(
            Text::new("Output file:")
                .with_default("")
                .with_help_message(&hint)
                .prompt(),
        )?
        else {
            return Ok(());
        };
        let Some(count) = prompt_answer(
            CustomType::<usize>::new("Max messages (0 = no limit):")
                .with_default(0)
                .prompt(),
        )?
        else {
            return Ok(());
        };
        let Some(from) = prompt_answer(
            Text::new("From (YYYY-MM-DD [HH:MM:SS], empty = any):")
                .with_default("")
                .prompt(),
        )?
        else {
            return Ok(());
        };
        let Some(to) = prompt_answer(
            Text::new("To (YYYY-MM-DD [HH:MM:SS], empty = now):")
                .with_default("")
                .prompt(),
        )?
        else {
            return Ok(());
        };

        let req = ExportRequest {
            chat_id,
            path: optional(path).map(PathBuf::from),
            count,
            from: parse_export_date(&from)?,
            to: parse_export_date(&to)?,
            progress_token: None,
        };

        let (sink, bar) = progress_sink();
        let cancel = CancellationToken::new();
        let res = with_ctrl_c(&cancel, self.exporter.export(&req, sink, &cancel)).await;
        if let Some(bar) = bar {
            bar.finish();
        }

        let outcome = res?;
        println!(
            "\nExported {} messages to {}\n",
            outcome.messages,
            outcome.path.display()
        );
        Ok(())
    }
}

#[async_trait]
impl InputPort for TuiInputPort {
    async fn run(&self) -> Result<(), DomainError> {
        loop {
            let actions = vec![MenuAction::Summarize, MenuAction::Export, MenuAction::Exit];
            let action = match prompt_answer(Select::new("What next?", actions).prompt())? {
                Some(action) => action,
                None => MenuAction::Exit,
            };
            let res = match action {
                MenuAction::Summarize => self.run_summarize().await,
                MenuAction::Export => self.run_export().await,
                MenuAction::Exit => return Ok(()),
            };
            match res {
                Ok(()) => {}
                Err(e) if e.is_cancelled() => {
                    warn!(error = %e, "operation cancelled");
                }
                Err(e) => {
                    error!(error = %e, "operation failed");
                    println!("Error: {}", e);
                }
            }
        }
    }
}
