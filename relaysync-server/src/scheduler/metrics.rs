use relaysync_core::metrics::MetricsEmitter;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

/// Start the metrics scheduler as a background tokio task.
///
/// Resolves to the number of emission rounds once `cancel` fires.
pub fn start_metrics(emitter: Arc<MetricsEmitter>, cancel: CancellationToken) -> JoinHandle<u64> {
    tokio::spawn(run_metrics_loop(emitter, cancel))
}

async fn run_metrics_loop(emitter: Arc<MetricsEmitter>, cancel: CancellationToken) -> u64 {
    let period = emitter.config().interval();
    tracing::info!("[Metrics] Scheduler started, interval {}s", period.as_secs());

    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut rounds = 0;

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            _ = ticker.tick() => {},
        }
        emitter.tick().await;
        rounds += 1;
    }

    tracing::info!("[Metrics] Scheduler stopped after {} rounds", rounds);
    rounds
}
