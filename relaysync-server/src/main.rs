//! relaysync Server - Headless Daemon
//!
//! A pure Rust daemon that:
//! - Keeps the Postfix `cidr:` access file in line with an upstream's published IP ranges
//! - Reloads Postfix when the applied set changes
//! - Pushes sync metrics on its own cadence
//! - Serves liveness and sync status over HTTP (`/health`, `/status`, `/postfix`, `/metrics`)
//!
//! Access via: http://localhost:8080

use anyhow::Result;
use clap::Parser;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

mod api;
mod cli;
mod config;
mod router;
mod scheduler;
mod server_utils;
mod state;
#[cfg(test)]
mod test_helpers;

use cli::Cli;
use config::AppConfig;
use relaysync_core::metrics::prometheus::{detached_handle, init_metrics};
use relaysync_core::metrics::{DatadogSink, MetricsEmitter, MetricsSink};
use relaysync_core::{
    status_channel, PostfixAgent, PostfixReloader, Severity, SlackNotifier, Synchronizer,
};
use state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_new(&cli.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = FmtSubscriber::builder().with_env_filter(filter).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = AppConfig::from_cli(&cli)?;
    info!("relaysync {} starting", env!("CARGO_PKG_VERSION"));
    info!(
        "Upstream {} every {}s -> {}",
        config.sync.upstream_url,
        config.sync.sync_interval_secs,
        config.sync.access_file.display()
    );

    let prometheus = match init_metrics() {
        Ok(handle) => handle,
        Err(e) => {
            warn!("[Metrics] Failed to install Prometheus recorder, /metrics will be empty: {}", e);
            detached_handle()
        },
    };

    let (publisher, status) = status_channel();
    let reloader =
        Arc::new(PostfixReloader::new(&config.sync.postfix_bin, config.sync.reload_timeout()));
    let synchronizer = Synchronizer::new(&config.sync, reloader, publisher)?;
    let access_file = synchronizer.access_file().clone();

    let notifier = SlackNotifier::from_config(&config.notify)?.map(Arc::new);
    let sink = DatadogSink::from_config(&config.metrics)?
        .map(|sink| Arc::new(sink) as Arc<dyn MetricsSink>);
    if sink.is_none() {
        info!("[Metrics] DD_API_KEY not set, metrics are only exposed on /metrics");
    }
    let emitter = Arc::new(MetricsEmitter::new(config.metrics.clone(), status.clone(), sink));

    let state = AppState::new(
        status,
        access_file,
        PostfixAgent::from_config(&config.sync),
        &config.sync.upstream_url,
        config.sync.sync_interval_secs,
        prometheus,
    );
    let app = router::build_router(state);
    let listener = server_utils::create_listener(config.listen_addr()).await?;

    if let Some(notifier) = &notifier {
        let text = format!(
            "relaysync {} started, syncing {} every {}s",
            env!("CARGO_PKG_VERSION"),
            config.sync.upstream_url,
            config.sync.sync_interval_secs
        );
        notifier.send(Severity::Info, &text).await;
    }

    let cancel = CancellationToken::new();
    let sync_task = scheduler::start_sync(
        Arc::new(synchronizer),
        config.sync.sync_interval(),
        notifier,
        cancel.clone(),
        config.sync.shutdown_grace(),
    );
    let metrics_task = scheduler::start_metrics(emitter, cancel.clone());

    axum::serve(listener, app)
        .with_graceful_shutdown(server_utils::shutdown_signal(cancel.clone()))
        .await?;
    cancel.cancel();

    let stats = sync_task.await?;
    let rounds = metrics_task.await?;
    info!(
        "[Server] Stopped after {} sync cycles ({} ticks skipped) and {} metrics rounds",
        stats.cycles, stats.skipped, rounds
    );

    Ok(())
}
