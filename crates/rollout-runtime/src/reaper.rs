use chrono::Utc;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

use crate::store::RolloutStore;

/// Periodic TTL cleanup driven by a tokio interval
pub struct Reaper;

/// Handle to a running [`Reaper`]. Dropping it also ends the loop.
pub struct ReaperHandle {
    stop: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

impl Reaper {
    /// Run `cleanup_expired` now and then every `period` until stopped.
    ///
    /// A failed pass is logged and the loop keeps going.
    pub fn spawn(store: RolloutStore, period: Duration) -> ReaperHandle {
        let period = period.max(Duration::from_millis(1));
        let (stop, mut stop_rx) = oneshot::channel::<()>();

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = &mut stop_rx => break,
                    _ = ticker.tick() => {
                        match store.cleanup_expired_at(Utc::now()).await {
                            Ok(report) => debug!(
                                deleted = report.deleted,
                                skipped = report.skipped,
                                failed = report.failed,
                                "Reaper pass finished"
                            ),
                            Err(err) => warn!(error = %err, "Reaper pass failed"),
                        }
                    }
                }
            }
        });

        ReaperHandle { stop, task }
    }
}

impl ReaperHandle {
    /// Stop the loop and wait for an in-flight pass to finish
    pub async fn stop(self) {
        let _ = self.stop.send(());
        let _ = self.task.await;
    }
}
