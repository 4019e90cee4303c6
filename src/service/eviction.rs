// Eviction task: periodic sweep of silent devices
//
// Runs on its own tokio task for the lifetime of the service and stops when
// its cancellation token fires.

use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::RegistryService;

/// Handle to the background sweep.
///
/// Call [`EvictionTask::shutdown`] to stop it and wait for the loop to exit.
pub struct EvictionTask {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

impl EvictionTask {
    /// Spawn the sweep. The first pass runs one `period` after spawning,
    /// then every `period`; each pass evicts devices idle longer than
    /// `timeout`.
    pub fn spawn(service: Arc<RegistryService>, period: Duration, timeout: Duration) -> Self {
        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let first_tick = Instant::now() + period;

        let handle = tokio::spawn(async move {
            let mut ticker = interval_at(first_tick, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            info!(
                period_secs = period.as_secs(),
                timeout_secs = timeout.as_secs(),
                "Eviction task started"
            );

            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => {
                        let evicted = service.sweep_inactive(timeout);
                        debug!(evicted, "Eviction sweep finished");
                    }
                }
            }

            info!("Eviction task stopped");
        });

        Self { cancel, handle }
    }

    /// Token that stops the sweep when cancelled.
    #[cfg(test)]
    pub(crate) fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    #[cfg(test)]
    pub(crate) fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Signal the loop to stop and wait for it to exit.
    pub async fn shutdown(self) {
        self.cancel.cancel();
        if let Err(e) = self.handle.await {
            tracing::error!("Eviction task panicked: {}", e);
        }
    }
}
