use relaysync_core::notify::outcome_message;
use relaysync_core::{CycleOutcome, SlackNotifier, SyncCycle};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tokio::time::{interval, timeout, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

/// What the loop did before it stopped.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoopStats {
    /// Cycles started
    pub cycles: u64,
    /// Ticks dropped because a cycle was still running
    pub skipped: u64,
}

/// Start the sync scheduler as a background tokio task
pub fn start_sync(
    cycle: Arc<dyn SyncCycle>,
    period: Duration,
    notifier: Option<Arc<SlackNotifier>>,
    cancel: CancellationToken,
    grace: Duration,
) -> JoinHandle<LoopStats> {
    tokio::spawn(run_sync_loop(cycle, period, notifier, cancel, grace))
}

async fn run_sync_loop(
    cycle: Arc<dyn SyncCycle>,
    period: Duration,
    notifier: Option<Arc<SlackNotifier>>,
    cancel: CancellationToken,
    grace: Duration,
) -> LoopStats {
    tracing::info!("[Sync] Scheduler started, interval {}s", period.as_secs());

    let permit = Arc::new(Semaphore::new(1));
    let failing = Arc::new(AtomicBool::new(false));
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut stats = LoopStats::default();

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            _ = ticker.tick() => {},
        }

        let Ok(guard) = Arc::clone(&permit).try_acquire_owned() else {
            stats.skipped += 1;
            tracing::warn!("[Sync] Previous cycle still running, skipping this tick");
            continue;
        };
        stats.cycles += 1;

        let cycle = Arc::clone(&cycle);
        let notifier = notifier.clone();
        let failing = Arc::clone(&failing);
        tokio::spawn(async move {
            let outcome = cycle.run_cycle().await;
            log_outcome(&outcome);

            let was_failing = failing.swap(outcome.is_failure(), Ordering::SeqCst);
            if let Some(notifier) = notifier {
                if let Some((severity, text)) = outcome_message(&outcome, !was_failing) {
                    notifier.send(severity, &text).await;
                }
            }
            // The next cycle may only start once this one's notification is out.
            drop(guard);
        });
    }

    tracing::info!(
        "[Sync] Shutdown requested, waiting up to {}s for in-flight cycle",
        grace.as_secs()
    );
    match timeout(grace, permit.acquire()).await {
        Ok(_) => tracing::info!("[Sync] Scheduler stopped"),
        Err(_) => tracing::warn!("[Sync] In-flight cycle did not finish within the grace period"),
    }
    stats
}

fn log_outcome(outcome: &CycleOutcome) {
    match outcome {
        CycleOutcome::Unchanged { ranges } => {
            tracing::info!("[Sync] Cycle complete: unchanged ({} ranges)", ranges);
        },
        CycleOutcome::Applied { ranges, added, removed, reload_ok } => {
            tracing::info!(
                "[Sync] Cycle complete: applied {} ranges (+{} -{}), reload ok: {}",
                ranges,
                added,
                removed,
                reload_ok
            );
        },
        CycleOutcome::Failed { kind, .. } => {
            tracing::info!("[Sync] Cycle complete: failed ({})", kind);
        },
    }
}
