//! Wiring & DI. Entry point: bootstrap adapters, inject into services, run UI.
//! No business logic here.

use dotenv::dotenv;
use std::path::PathBuf;
use std::sync::Arc;
use tg_digest::adapters::ai::{MockProvider, ProviderName, build_provider};
use tg_digest::adapters::telegram::session;
use tg_digest::adapters::telegram::{DialogPeerResolver, GrammersMessageSource};
use tg_digest::adapters::ui::TuiInputPort;
use tg_digest::ports::{InputPort, MessageSource, SummaryProvider};
use tg_digest::shared::RateLimiter;
use tg_digest::shared::config::AppConfig;
use tg_digest::usecases::{ExportService, Paginator, RollingSummarizer};
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    let env_loaded = dotenv();
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    match &env_loaded {
        Ok(path) => info!(path = %path.display(), "loaded .env"),
        Err(_) => info!(cwd = %cwd.display(), "no .env found (check CWD)"),
    }

    tg_digest::adapters::ui::init_ui();

    let cfg = AppConfig::load().unwrap_or_else(|e| {
        warn!(error = %e, "config load failed, using defaults");
        AppConfig::default()
    });
    let tuning = cfg.tuning();
    info!(
        batch_tokens = tuning.batch_tokens,
        rate_limit_ms = tuning.rate_limit_interval.as_millis() as u64,
        heartbeat_secs = tuning.heartbeat_interval.as_secs(),
        "tuning"
    );

    // --- Telegram client (existing session only; login happens elsewhere) ---
    let session_path = cfg.session_path_or_default();
    let client = session::connect(cfg.api_id(), &session_path).await?;
    session::ensure_authorized(&client)
        .await
        .map_err(|e| anyhow::anyhow!("{}", e))?;

    // --- History source: one limiter shared by every Telegram request ---
    let limiter = RateLimiter::new(tuning.rate_limit_interval);
    let resolver = Arc::new(DialogPeerResolver::new(client.clone()));
    let source: Arc<dyn MessageSource> =
        Arc::new(GrammersMessageSource::new(client, resolver, limiter));
    let paginator = Arc::new(Paginator::new(source, tuning.clone()));

    // --- Summary provider ---
    let provider: Arc<dyn SummaryProvider> = match build_provider(&cfg, None) {
        Ok(provider) => provider,
        Err(e) if matches!(cfg.provider_name(), Ok(ProviderName::Sampling)) => {
            warn!(
                error = %e,
                "no sampling host in terminal mode, using mock provider; set TG_DIGEST_PROVIDER for real digests"
            );
            Arc::new(MockProvider::new())
        }
        Err(e) => anyhow::bail!("{}", e),
    };

    // --- Services ---
    let summarizer = Arc::new(RollingSummarizer::new(
        Arc::clone(&paginator),
        provider,
        tuning.clone(),
    ));
    let allowed_paths = cfg.allowed_paths();
    info!(paths = ?allowed_paths, "export allowed paths");
    let exporter = Arc::new(ExportService::new(paginator, allowed_paths, tuning));

    let input_port: Arc<dyn InputPort> = Arc::new(TuiInputPort::new(summarizer, exporter));

    // --- Run (main menu -> Summarize / Export) ---
    input_port
        .run()
        .await
        .map_err(|e| anyhow::anyhow!("{}", e))?;

    Ok(())
}
