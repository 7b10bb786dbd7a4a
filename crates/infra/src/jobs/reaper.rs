//! Periodic eviction of finished jobs.

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::store::{DEFAULT_RETENTION, JobStore};

/// Handle to control and join the reaper task.
#[derive(Debug)]
pub struct ReaperHandle {
    shutdown: CancellationToken,
    join: Option<JoinHandle<()>>,
}

impl ReaperHandle {
    /// Request shutdown and wait for the reaper to stop.
    pub async fn shutdown(mut self) {
        self.shutdown.cancel();
        if let Some(j) = self.join.take() {
            let _ = j.await;
        }
    }
}

impl Drop for ReaperHandle {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

/// Evicts terminal jobs older than `retention` every `interval`.
#[derive(Debug, Clone)]
pub struct JobReaper {
    pub interval: Duration,
    pub retention: Duration,
}

impl Default for JobReaper {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(10 * 60),
            retention: DEFAULT_RETENTION,
        }
    }
}

impl JobReaper {
    pub fn new(interval: Duration, retention: Duration) -> Self {
        Self {
            interval,
            retention,
        }
    }

    /// Spawn the reaper on the current tokio runtime.
    ///
    /// The first sweep happens one `interval` after spawning.
    pub fn spawn<S: JobStore + 'static>(&self, store: S) -> ReaperHandle {
        let shutdown = CancellationToken::new();
        let token = shutdown.clone();
        let interval = self.interval;
        let retention = self.retention;

        let join = tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            info!(interval_secs = interval.as_secs(), retention_secs = retention.as_secs(), "job reaper started");

            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => {
                        let removed = store.reap(retention);
                        if removed > 0 {
                            info!(removed, "reaped finished jobs");
                        } else {
                            debug!("no finished jobs to reap");
                        }
                    }
                }
            }

            info!("job reaper stopped");
        });

        ReaperHandle {
            shutdown,
            join: Some(join),
        }
    }
}
