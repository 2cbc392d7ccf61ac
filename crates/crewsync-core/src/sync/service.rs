//! Long-lived owner of the sync loop.

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::sync::{watch, Notify};

use crate::models::{RecordType, SyncQueueItem, SyncRunStats, WorkRecord, WorkerId};
use crate::services::background::{non_overlapping_interval, BackgroundTask};
use crate::services::DatabaseService;
use crate::util::now_ms;
use crate::{Error, Result};

use super::crm::CrmClient;
use super::processor::SyncQueueProcessor;
use super::reachability::ReachabilityProbe;

/// Runs a queue pass every `interval` and right after a record is produced.
pub struct SyncService<C, P> {
    db: DatabaseService,
    processor: Arc<SyncQueueProcessor<C, P>>,
    interval: Duration,
    trigger: Arc<Notify>,
    task: Option<BackgroundTask>,
}

impl<C, P> SyncService<C, P>
where
    C: CrmClient + 'static,
    P: ReachabilityProbe + 'static,
{
    pub fn new(
        db: DatabaseService,
        processor: SyncQueueProcessor<C, P>,
        interval: Duration,
    ) -> Self {
        Self {
            db,
            processor: Arc::new(processor),
            interval,
            trigger: Arc::new(Notify::new()),
            task: None,
        }
    }

    pub const fn is_running(&self) -> bool {
        self.task.is_some()
    }

    /// Spawn the loop. The first pass runs immediately.
    pub fn start(&mut self) -> Result<()> {
        if self.task.is_some() {
            return Err(Error::InvalidInput("sync service already running".to_string()));
        }

        let processor = Arc::clone(&self.processor);
        let trigger = Arc::clone(&self.trigger);
        let interval = self.interval;
        self.task = Some(BackgroundTask::spawn("sync service", move |shutdown| {
            run_loop(processor, trigger, interval, shutdown)
        }));
        Ok(())
    }

    /// Stop scheduling passes; an in-flight pass completes first.
    pub async fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            task.stop().await;
        }
    }

    /// Wake the loop for an immediate pass.
    pub fn trigger(&self) {
        self.trigger.notify_one();
    }

    /// Store a new record, enqueue it and wake the loop.
    pub async fn enqueue_record(
        &self,
        record_type: RecordType,
        worker_id: &WorkerId,
        payload: Value,
    ) -> Result<(WorkRecord, SyncQueueItem)> {
        let submitted = self
            .db
            .submit_record(record_type, worker_id, payload, now_ms())
            .await?;
        self.trigger();
        Ok(submitted)
    }

    /// Run one pass on the caller's task, outside the loop.
    pub async fn run_once(&self) -> Result<SyncRunStats> {
        self.processor.run_pass(now_ms()).await
    }
}

async fn run_loop<C: CrmClient, P: ReachabilityProbe>(
    processor: Arc<SyncQueueProcessor<C, P>>,
    trigger: Arc<Notify>,
    interval: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut ticker = non_overlapping_interval(interval);

    loop {
        tokio::select! {
            biased;
            _ = shutdown.changed() => break,
            () = trigger.notified() => tracing::debug!("Sync pass triggered by new record"),
            _ = ticker.tick() => {
                tracing::debug!("Sync scheduler tick: interval={}s", interval.as_secs());
            }
        }

        if *shutdown.borrow() {
            break;
        }

        if let Err(error) = processor.run_pass(now_ms()).await {
            tracing::error!("Sync pass failed: {error}");
        }
    }
}
