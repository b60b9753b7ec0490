//! plus_counter - group chat plus counter bot
//!
//! Counts `+` markers per user in a Telegram group and posts ranked
//! daily and weekly reports.

use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use plus_counter::jobs::{RolloverScheduler, ScheduleConfig};
use plus_counter::transport::{ReportSink, TelegramClient, UpdatePoller};
use plus_counter::{Config, CounterService, CounterStore, JsonFileStore, ResetPolicy};

/// Initialize tracing/logging
fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "plus_counter=info".into());

    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    init_tracing();

    // Missing token or chat id stops the process here
    let config = Arc::new(Config::from_env()?);

    tracing::info!(
        chat_id = config.group_chat_id,
        data_path = %config.data_path.display(),
        "Starting plus counter bot"
    );

    let store = JsonFileStore::new(&config.data_path);
    tracing::info!(path = %store.path().display(), "Using snapshot file");
    let store: Arc<dyn CounterStore> = Arc::new(store);

    let service = CounterService::new(store)
        .with_reset_policy(ResetPolicy::from_defer_flag(config.defer_reset_on_send_failure));

    let client = TelegramClient::new(&config)?;
    let sink: Arc<dyn ReportSink> = Arc::new(client.clone());

    let scheduler = RolloverScheduler::new(
        service.clone(),
        sink,
        ScheduleConfig::from_config(&config),
    )
    .start();

    let poller = UpdatePoller::new(Arc::new(client), service, config.poll_timeout_secs).start();

    tracing::info!("Bot is running");

    shutdown_signal().await;

    tracing::info!("Shutting down...");
    poller.abort();
    scheduler.abort();
    tracing::info!("Goodbye!");

    Ok(())
}

/// Shutdown signal handler for graceful shutdown
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown...");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown...");
        },
    }
}
