//! Periodic autoclose sweeper task.

use std::{sync::Arc, time::Duration};

use tokio::{sync::watch, task::JoinHandle, time::MissedTickBehavior};

use crate::registry::SessionRegistry;

/// Handle to a running sweeper task.
///
/// Dropping the handle also stops the loop: the task exits when the
/// shutdown channel closes.
pub struct AutocloseHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl AutocloseHandle {
    /// Stop the sweeper and wait for it to finish.
    pub async fn stop(self) {
        let _ = self.shutdown.send(true);
        let _ = self.task.await;
    }
}

/// Spawn a task that sweeps `registry` every `period`.
///
/// Eviction decisions use the registry's injected clock; the tokio timer
/// only paces the sweeps.
#[must_use]
pub fn spawn_autoclose(registry: Arc<SessionRegistry>, period: Duration) -> AutocloseHandle {
    let (shutdown, mut shutdown_rx) = watch::channel(false);

    let task = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let evicted = registry.sweep();
                    if !evicted.is_empty() {
                        tracing::info!(
                            evicted = evicted.len(),
                            remaining = registry.count(),
                            "autoclose sweep evicted idle sessions"
                        );
                    }
                }
                changed = shutdown_rx.changed() => {
                    if changed.is_err() || *shutdown_rx.borrow() {
                        break;
                    }
                }
            }
        }
    });

    AutocloseHandle { shutdown, task }
}
