use std::time::Duration;

use anyhow::Result;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use stagewatch::config::Settings;
use stagewatch::connector::TicketingClient;
use stagewatch::snapshot::{MemoryStore, SnapshotService};

fn init_tracing(log_dir: &str) -> Result<()> {
    std::fs::create_dir_all(log_dir)?;

    let file_appender = tracing_appender::rolling::daily(log_dir, "stagewatch.log");
    let (non_blocking_file, _guard) = tracing_appender::non_blocking(file_appender);

    let console_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_level(true)
        .compact();

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking_file)
        .json()
        .with_current_span(false)
        .with_span_list(true);

    tracing_subscriber::registry()
        .with(console_layer)
        .with(file_layer)
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    // Keep the file appender alive for the process lifetime.
    std::mem::forget(_guard);

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let settings = Settings::load()?;
    init_tracing(&settings.log_dir)?;

    info!("🎭 Stagewatch - Ticket Sales Snapshot Daemon");
    info!(company = %settings.company_id, interval = settings.poll_interval_secs, "starting");

    let client = TicketingClient::new(&settings);
    let service = SnapshotService::new(
        client,
        MemoryStore::new(),
        settings.max_consecutive_errors,
    );
    let interval = Duration::from_secs(settings.poll_interval_secs);

    let snapshot_task = tokio::spawn(service.update_loop(interval));

    match signal::ctrl_c().await {
        Ok(()) => info!("🛑 Shutdown signal received"),
        Err(e) => error!("Failed to listen for shutdown signal: {}", e),
    }

    snapshot_task.abort();
    info!("👋 Stagewatch shutdown complete");
    Ok(())
}
