/*
telefeed - single-binary main.rs
Starts the Rocket status server and runs the delivery worker inside the same process.
*/

use anyhow::Result;
use chrono::Utc;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Notify;
use tokio::time::Duration;
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

use common::{Config, Secrets};
use telefeed::ingestion::HttpFeedSource;
use telefeed::llm::remote::RemoteLlmProvider;
use telefeed::notify::{TelegramNotifier, TELEGRAM_API_URL};
use telefeed::pipeline::Pipeline;
use telefeed::scraping::ReadabilityExtractor;
use telefeed::server::{self, AppState};
use telefeed::store::BlobSeenStore;
use telefeed::worker::run_worker;

#[derive(Parser, Debug)]
#[command(name = "telefeed", about = "Telefeed single-binary status server + delivery worker")]
struct Args {
    /// Path to config.toml
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Disable background worker (run status server only)
    #[arg(long)]
    no_worker: bool,

    /// Run worker only (do not bind HTTP server)
    #[arg(long)]
    worker_only: bool,

    /// Override log level (info, debug, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let filter = EnvFilter::try_new(&args.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).init();

    // Resolve config paths
    let default_path = PathBuf::from("config.default.toml");

    let override_path = if let Some(p) = args.config {
        if !p.exists() {
            error!(path = ?p, "specified config file not found");
            return Err(anyhow::anyhow!("Config file not found: {}", p.display()));
        }
        Some(p)
    } else {
        let p = PathBuf::from("config.toml");
        if p.exists() {
            Some(p)
        } else {
            None
        }
    };

    // Load configuration with defaults
    let config = match Config::load_with_defaults(
        if default_path.exists() { Some(&default_path) } else { None },
        override_path.as_deref(),
    )
    .await
    {
        Ok(cfg) => cfg,
        Err(e) => {
            error!(%e, "failed to load configuration");
            return Err(e);
        }
    };
    info!(default = ?default_path, override_file = ?override_path, "configuration loaded");
    info!("monitoring {} feeds", config.feeds.urls.len());

    // Resolve secrets once; missing values degrade the collaborator that
    // needs them, never the process.
    let secrets = Secrets::from_config(&config);

    let pipeline = Arc::new(build_pipeline(&config, &secrets)?);
    let shutdown_notify = Arc::new(Notify::new());

    // If worker_only, run the worker (without HTTP) until shutdown is requested
    if args.worker_only {
        info!("Starting in worker-only mode");
        let worker = run_worker(
            pipeline.clone(),
            config.scheduler.clone(),
            shutdown_notify.clone(),
        );

        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("ctrl-c received, notifying worker to shutdown");
                shutdown_notify.notify_waiters();
                // give worker a small grace period
                tokio::time::sleep(Duration::from_secs(5)).await;
            }
            res = worker => {
                if let Err(e) = res {
                    error!(%e, "worker encountered an error");
                }
            }
        }
        info!("worker-only run finished");
        return Ok(());
    }

    // Otherwise, spawn the worker exactly once (main owns the handle for the
    // process lifetime) and then start the HTTP status server.
    let mut worker_handle = None;
    if !args.no_worker {
        info!("Spawning background worker task");
        let w_pipeline = pipeline.clone();
        let w_scheduler = config.scheduler.clone();
        let w_shutdown = shutdown_notify.clone();
        worker_handle = Some(tokio::spawn(async move {
            if let Err(e) = run_worker(w_pipeline, w_scheduler, w_shutdown).await {
                error!(%e, "background worker failed");
                Err(e)
            } else {
                Ok(())
            }
        }));
    } else {
        info!("Background worker disabled via CLI (--no-worker)");
    }

    // Launch the Rocket server (blocking until Rocket shuts down)
    info!("Launching Rocket HTTP server");
    let state = AppState {
        started_at: Utc::now(),
        config: Arc::new(config),
    };
    if let Err(e) = server::launch_rocket(state).await {
        error!(%e, "Rocket server failed");
    }

    // When the server shuts down, notify the worker and wait a bit for
    // graceful termination.
    info!("HTTP server stopped; notifying worker to shutdown");
    shutdown_notify.notify_waiters();

    if let Some(handle) = worker_handle {
        match tokio::time::timeout(Duration::from_secs(20), handle).await {
            Ok(join_res) => match join_res {
                Ok(Ok(_)) => info!("worker exited cleanly"),
                Ok(Err(e)) => error!(%e, "worker task returned an error"),
                Err(join_err) => error!(%join_err, "worker task panicked"),
            },
            Err(_) => {
                info!("Timed out waiting for worker to exit; continuing shutdown");
            }
        }
    }

    info!("Shutdown complete");
    Ok(())
}

/// Assemble the pipeline from configuration. Collaborator construction is
/// infallible beyond HTTP-client setup; credential gaps surface per call.
fn build_pipeline(config: &Config, secrets: &Secrets) -> Result<Pipeline> {
    let fetch_timeout = config
        .politeness
        .as_ref()
        .and_then(|p| p.fetch_timeout_seconds)
        .unwrap_or(10);

    let source = Arc::new(HttpFeedSource::new(fetch_timeout)?);
    let extractor = Arc::new(ReadabilityExtractor::new(fetch_timeout)?);
    let store = Arc::new(BlobSeenStore::new(&config.store, secrets.store_token.clone())?);

    let llm_cfg = config.llm.as_ref();
    let api_url = llm_cfg
        .and_then(|l| l.api_url.clone())
        .unwrap_or_else(|| "http://localhost:11434/v1/chat/completions".to_string());
    let model = llm_cfg
        .and_then(|l| l.model.clone())
        .unwrap_or_else(|| "gpt-4o-mini".to_string());
    let llm_timeout = llm_cfg.and_then(|l| l.timeout_seconds).unwrap_or(30);
    let max_tokens = llm_cfg.and_then(|l| l.max_tokens).unwrap_or(150);
    let api_key = secrets.llm_api_key.clone().unwrap_or_default();

    let llm = Arc::new(
        RemoteLlmProvider::new(api_url, api_key, model).with_defaults(llm_timeout, max_tokens, 0.3),
    );

    let telegram_api = config
        .telegram
        .as_ref()
        .and_then(|t| t.api_url.clone())
        .unwrap_or_else(|| TELEGRAM_API_URL.to_string());
    let notifier = Arc::new(TelegramNotifier::new(
        telegram_api,
        secrets.bot_token.clone(),
        secrets.chat_id.clone(),
    ));

    Ok(Pipeline::new(
        config.feeds.urls.clone(),
        store,
        source,
        extractor,
        llm,
        notifier,
        max_tokens,
    ))
}
