//! Lifecycle of a long-lived polling task.

use std::future::Future;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Interval, MissedTickBehavior};

/// A spawned loop plus the channel used to ask it to stop.
pub(crate) struct BackgroundTask {
    name: &'static str,
    shutdown: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl BackgroundTask {
    /// Spawn `body` with a receiver that flips to `true` on shutdown.
    pub(crate) fn spawn<F, Fut>(name: &'static str, body: F) -> Self
    where
        F: FnOnce(watch::Receiver<bool>) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let (shutdown, receiver) = watch::channel(false);
        let handle = tokio::spawn(body(receiver));
        tracing::info!("Started {name}");
        Self {
            name,
            shutdown,
            handle,
        }
    }

    /// Signal shutdown and wait for the current tick to finish.
    pub(crate) async fn stop(self) {
        let _ = self.shutdown.send(true);
        if let Err(error) = self.handle.await {
            tracing::error!("{} task ended abnormally: {error}", self.name);
        }
        tracing::info!("Stopped {}", self.name);
    }
}

/// Interval whose next tick waits for the previous one to finish.
pub(crate) fn non_overlapping_interval(period: Duration) -> Interval {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker
}
