//! Background staleness sweep.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use gatekeeper_core::ports::Clock;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use super::policy::PolicyRegistry;
use super::store::VisitorStore;

/// Sweeper lifecycle errors.
#[derive(Debug, thiserror::Error)]
pub enum SweeperError {
    #[error("the visitor sweeper must be started from within a Tokio runtime")]
    NoRuntime,
}

struct SweeperTask {
    shutdown: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

/// Owns the single background task that periodically calls
/// [`VisitorStore::sweep`].
pub(crate) struct Sweeper {
    interval: Duration,
    task: Mutex<Option<SweeperTask>>,
}

impl Sweeper {
    pub(crate) fn new(interval: Duration) -> Self {
        Self {
            interval,
            task: Mutex::new(None),
        }
    }

    /// Spawn the sweep task. A second call while it runs is a no-op and
    /// returns `Ok(false)`.
    pub(crate) fn start(
        &self,
        store: Arc<VisitorStore>,
        policies: Arc<PolicyRegistry>,
        clock: Arc<dyn Clock>,
    ) -> Result<bool, SweeperError> {
        let mut task = self.lock();
        if task.as_ref().is_some_and(|t| !t.handle.is_finished()) {
            return Ok(false);
        }

        let runtime =
            tokio::runtime::Handle::try_current().map_err(|_| SweeperError::NoRuntime)?;
        let (shutdown, shutdown_rx) = watch::channel(false);
        let handle = runtime.spawn(run(self.interval, shutdown_rx, store, policies, clock));
        *task = Some(SweeperTask { shutdown, handle });

        tracing::info!(
            interval_secs = self.interval.as_secs(),
            "Visitor sweeper started"
        );
        Ok(true)
    }

    /// Signal the task to stop and wait for it to exit. Returns `false` if
    /// nothing was running.
    pub(crate) async fn stop(&self) -> bool {
        let task = self.lock().take();
        let Some(task) = task else {
            return false;
        };

        let _ = task.shutdown.send(true);
        if let Err(e) = task.handle.await {
            if e.is_panic() {
                tracing::error!("Visitor sweeper panicked: {}", e);
            }
        }
        true
    }

    pub(crate) fn is_running(&self) -> bool {
        self.lock()
            .as_ref()
            .is_some_and(|task| !task.handle.is_finished())
    }

    fn lock(&self) -> MutexGuard<'_, Option<SweeperTask>> {
        self.task.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for Sweeper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sweeper")
            .field("interval", &self.interval)
            .field("running", &self.is_running())
            .finish()
    }
}

async fn run(
    period: Duration,
    mut shutdown: watch::Receiver<bool>,
    store: Arc<VisitorStore>,
    policies: Arc<PolicyRegistry>,
    clock: Arc<dyn Clock>,
) {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick completes immediately.
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let removed = store.sweep(&policies, clock.now());
                tracing::debug!(
                    removed,
                    remaining = store.len(),
                    "Visitor sweep completed"
                );
            }
            _ = shutdown.changed() => break,
        }
    }

    tracing::info!("Visitor sweeper stopped");
}
