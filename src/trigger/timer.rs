//! Interval timer for continuous monitoring
//!
//! Fires `Trigger::Timer` every `interval_secs`. The first tick is
//! skipped so the client does not record the moment it starts.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use super::Trigger;

/// Spawn the auto-capture timer task.
pub fn spawn_interval_timer(
    trigger_tx: mpsc::Sender<Trigger>,
    interval_secs: u64,
    cancel: CancellationToken,
) {
    tokio::spawn(async move {
        let mut ticker = interval(Duration::from_secs(interval_secs));
        // If a capture/upload cycle overruns the interval, fire once when
        // the loop is free again rather than replaying missed ticks.
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        // Immediate first tick.
        ticker.tick().await;

        log::info!("Auto-capture timer started ({}s interval)", interval_secs);

        loop {
            tokio::select! {
                biased;

                _ = cancel.cancelled() => {
                    log::info!("Auto-capture timer cancelled");
                    break;
                }

                _ = ticker.tick() => {
                    // Dropped, not queued, when a cycle is in flight.
                    if let Err(e) = trigger_tx.try_send(Trigger::Timer) {
                        log::debug!("Timer trigger not observed: {}", e);
                    }
                }
            }
        }
    });
}
