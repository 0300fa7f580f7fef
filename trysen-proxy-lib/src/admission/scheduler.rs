use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::controller::{AdmissionController, IntervalSnapshot};
use crate::telemetry::Metrics;

/// Spawn the task that closes an admission interval every `controller.window()`.
///
/// Ticks are independent of request traffic. The first one fires a full period after the call.
/// The task exits as soon as `cancel` is cancelled.
pub fn spawn_interval_ticker(
    controller: Arc<AdmissionController>,
    cancel: CancellationToken,
    metrics: Option<Arc<Metrics>>,
) -> JoinHandle<()> {
    let period = controller.window();
    let start = Instant::now();
    controller.restart_interval_at(start);
    tokio::spawn(async move {
        let mut ticker = interval_at(start + period, period);
        // A late tick starts the next interval from when it actually fired
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    debug!("interval ticker stopped");
                    break;
                }
                _ = ticker.tick() => {
                    let snapshot = controller.rollover();
                    let next_limit = controller.current_limit();
                    log_interval(&snapshot, next_limit);
                    if let Some(ref m) = metrics {
                        m.record_interval(&snapshot, next_limit);
                    }
                }
            }
        }
    })
}

fn log_interval(snapshot: &IntervalSnapshot, next_limit: u64) {
    match serde_json::to_string(snapshot) {
        Ok(stats) => info!(%stats, next_limit, "admission interval closed"),
        Err(e) => warn!(error = %e, "failed to serialize interval stats"),
    }
}
