//! Background sweeper that evicts idle sessions.

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::store::SharedStore;

/// Running sweeper task.
///
/// The task sweeps once per `period`, each pass evicting sessions idle for
/// longer than `period`, until [`shutdown`](Self::shutdown) is called or
/// the handle is dropped.
#[derive(Debug)]
pub struct EvictionHandle {
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl EvictionHandle {
    /// Spawn the sweeper on the current tokio runtime.
    ///
    /// The first pass runs one full `period` after the call.
    pub(crate) fn spawn(store: SharedStore, period: Duration) -> Self {
        let cancel = CancellationToken::new();
        let token = cancel.clone();

        let task = tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            info!(period_secs = period.as_secs(), "Session sweeper started");

            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => {
                        let evicted = store.sweep(period);
                        debug!(evicted, live = store.len(), "Session sweep pass complete");
                    }
                }
            }

            debug!("Session sweeper stopped");
        });

        Self {
            cancel,
            task: Some(task),
        }
    }

    /// Whether the sweeper task is still running.
    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Stop the sweeper and wait for the task to exit.
    pub async fn shutdown(mut self) {
        self.cancel.cancel();
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for EvictionHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
