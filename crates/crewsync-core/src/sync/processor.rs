//! One pass over the sync queue.

use crate::config::FieldMapping;
use crate::models::{SyncQueueItem, SyncRunStats};
use crate::services::DatabaseService;
use crate::Result;

use super::crm::{CrmClient, DeliveryOutcome};
use super::reachability::ReachabilityProbe;

/// Delivers queued records to the CRM with a bounded retry budget.
pub struct SyncQueueProcessor<C, P> {
    db: DatabaseService,
    crm: C,
    probe: P,
    mapping: FieldMapping,
    max_attempts: u32,
}

impl<C: CrmClient, P: ReachabilityProbe> SyncQueueProcessor<C, P> {
    pub fn new(
        db: DatabaseService,
        crm: C,
        probe: P,
        mapping: FieldMapping,
        max_attempts: u32,
    ) -> Self {
        Self {
            db,
            crm,
            probe,
            mapping,
            max_attempts: max_attempts.max(1),
        }
    }

    /// Load the pending queue and process it.
    pub async fn run_pass(&self, now: i64) -> Result<SyncRunStats> {
        if !self.is_online().await {
            return Ok(SyncRunStats::default());
        }
        let items = self.db.list_pending().await?;
        self.deliver_all(&items, now).await
    }

    /// Process `items` in order, one at a time.
    ///
    /// When the probe reports offline nothing is read or written and zero
    /// counts are returned.
    pub async fn process_queue(&self, items: &[SyncQueueItem], now: i64) -> Result<SyncRunStats> {
        if !self.is_online().await {
            return Ok(SyncRunStats::default());
        }
        self.deliver_all(items, now).await
    }

    async fn is_online(&self) -> bool {
        let online = self.probe.is_reachable().await;
        if !online {
            tracing::info!("Network unreachable, skipping sync pass");
        }
        online
    }

    async fn deliver_all(&self, items: &[SyncQueueItem], now: i64) -> Result<SyncRunStats> {
        let mut stats = SyncRunStats::default();
        for item in items {
            self.deliver(item, now, &mut stats).await?;
        }

        if !stats.is_empty() {
            let finished_at = crate::util::now_ms().max(now);
            self.db.append_sync_run(now, finished_at, stats).await?;
            tracing::info!(
                "Sync pass: {} delivered, {} duplicates, {} retried, {} failed",
                stats.delivered,
                stats.duplicates,
                stats.retried,
                stats.failed
            );
        }
        Ok(stats)
    }

    async fn deliver(
        &self,
        item: &SyncQueueItem,
        now: i64,
        stats: &mut SyncRunStats,
    ) -> Result<()> {
        let outcome = match self
            .mapping
            .map_record(item.record_type, item.record_id, &item.payload)
        {
            Ok(mapped) => self.crm.create_record(&mapped).await,
            Err(error) => DeliveryOutcome::Failed {
                message: error.to_string(),
                status: None,
            },
        };

        match outcome {
            DeliveryOutcome::Delivered { remote_id } => {
                let found = self
                    .db
                    .mark_record_delivered(&item.record_id, remote_id.as_deref(), now)
                    .await?;
                warn_if_missing(item, found);
                self.db.remove_queue_item(item.id).await?;
                stats.delivered += 1;
                tracing::debug!(
                    "Delivered {} {} (remote id {})",
                    item.record_type,
                    item.record_id,
                    remote_id.as_deref().unwrap_or("-")
                );
            }
            DeliveryOutcome::Duplicate { existing_id } => {
                let found = self
                    .db
                    .mark_record_duplicate(&item.record_id, existing_id.as_deref(), now)
                    .await?;
                warn_if_missing(item, found);
                self.db.remove_queue_item(item.id).await?;
                stats.duplicates += 1;
                tracing::info!(
                    "{} {} already exists remotely, flagged for review",
                    item.record_type,
                    item.record_id
                );
            }
            DeliveryOutcome::Failed { message, status } => {
                let attempts = item.retry_count.saturating_add(1);
                let found = self.db.mark_record_error(&item.record_id, &message).await?;
                warn_if_missing(item, found);

                if attempts >= self.max_attempts {
                    let exhausted = SyncQueueItem {
                        retry_count: attempts,
                        ..item.clone()
                    };
                    self.db.move_to_failed(&exhausted, &message, now).await?;
                    stats.failed += 1;
                    tracing::warn!(
                        "Giving up on {} {} after {attempts} attempts: {message}",
                        item.record_type,
                        item.record_id
                    );
                } else {
                    self.db
                        .record_failed_attempt(item.id, attempts, &message)
                        .await?;
                    stats.retried += 1;
                    tracing::debug!(
                        "Delivery of {} {} failed (attempt {attempts}/{}, status {status:?}): {message}",
                        item.record_type,
                        item.record_id,
                        self.max_attempts
                    );
                }
            }
        }
        Ok(())
    }
}

fn warn_if_missing(item: &SyncQueueItem, found: bool) {
    if !found {
        tracing::warn!(
            "Originating {} {} for queue item {} no longer exists",
            item.record_type,
            item.record_id,
            item.id
        );
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;

    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;
    use crate::models::{RecordType, WorkerId, WorkerRole};
    use crate::sync::testing::{FixedProbe, ScriptedCrm};

    fn failed(message: &str) -> DeliveryOutcome {
        DeliveryOutcome::Failed {
            message: message.to_string(),
            status: Some(503),
        }
    }

    async fn setup() -> (DatabaseService, WorkerId) {
        let db = DatabaseService::open_in_memory().await.unwrap();
        let worker = db
            .create_worker("Ada", WorkerRole::Worker, None, None)
            .await
            .unwrap();
        (db, worker.id)
    }

    async fn submit_survey(
        db: &DatabaseService,
        worker_id: &WorkerId,
        phone: &str,
    ) -> SyncQueueItem {
        db.submit_record(
            RecordType::Survey,
            worker_id,
            json!({"first_name": "Lee", "last_name": "Park", "phone": phone}),
            1_000,
        )
        .await
        .unwrap()
        .1
    }

    fn processor(
        db: &DatabaseService,
        crm: ScriptedCrm,
        online: bool,
    ) -> SyncQueueProcessor<ScriptedCrm, FixedProbe> {
        SyncQueueProcessor::new(
            db.clone(),
            crm,
            FixedProbe::new(online),
            FieldMapping::default(),
            3,
        )
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn delivered_items_leave_queue_and_mark_record() {
        let (db, worker_id) = setup().await;
        let item = submit_survey(&db, &worker_id, "555-010-2030").await;
        let processor = processor(
            &db,
            ScriptedCrm::new([DeliveryOutcome::Delivered {
                remote_id: Some("00Q1".to_string()),
            }]),
            true,
        );

        let stats = processor.run_pass(5_000).await.unwrap();
        assert_eq!(stats.delivered, 1);
        assert!(db.list_pending().await.unwrap().is_empty());

        let record = db.get_record(&item.record_id).await.unwrap().unwrap();
        assert!(record.synced);
        assert_eq!(record.remote_id.as_deref(), Some("00Q1"));
        assert_eq!(record.sync_error, None);
        assert_eq!(record.synced_at, Some(5_000));
        assert_eq!(db.list_sync_runs(10).await.unwrap()[0].stats, stats);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn delivery_clears_previous_error() {
        let (db, worker_id) = setup().await;
        let item = submit_survey(&db, &worker_id, "5550102030").await;
        let processor = processor(
            &db,
            ScriptedCrm::new([failed("timeout"), DeliveryOutcome::Delivered { remote_id: None }]),
            true,
        );

        processor.run_pass(2_000).await.unwrap();
        let record = db.get_record(&item.record_id).await.unwrap().unwrap();
        assert_eq!(record.sync_error.as_deref(), Some("timeout"));

        processor.run_pass(3_000).await.unwrap();
        let record = db.get_record(&item.record_id).await.unwrap().unwrap();
        assert!(record.synced);
        assert_eq!(record.sync_error, None);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn duplicates_are_flagged_for_review_and_removed() {
        let (db, worker_id) = setup().await;
        let item = submit_survey(&db, &worker_id, "5550102030").await;
        let processor = processor(
            &db,
            ScriptedCrm::new([DeliveryOutcome::Duplicate {
                existing_id: Some("00Q9".to_string()),
            }]),
            true,
        );

        let stats = processor.run_pass(5_000).await.unwrap();
        assert_eq!(stats.duplicates, 1);
        assert_eq!(stats.failed, 0);
        assert!(db.list_pending().await.unwrap().is_empty());
        assert!(db.list_failed(10).await.unwrap().is_empty());

        let record = db.get_record(&item.record_id).await.unwrap().unwrap();
        assert!(record.needs_review);
        assert_eq!(record.sync_error, None);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn failures_increment_retry_count_by_one_per_attempt() {
        let (db, worker_id) = setup().await;
        submit_survey(&db, &worker_id, "5550102030").await;
        let processor = processor(&db, ScriptedCrm::new([failed("first"), failed("second")]), true);

        let stats = processor.run_pass(2_000).await.unwrap();
        assert_eq!(stats.retried, 1);
        let pending = db.list_pending().await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].retry_count, 1);
        assert_eq!(pending[0].last_error.as_deref(), Some("first"));

        processor.run_pass(3_000).await.unwrap();
        let pending = db.list_pending().await.unwrap();
        assert_eq!(pending[0].retry_count, 2);
        assert_eq!(pending[0].last_error.as_deref(), Some("second"));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn third_failure_moves_item_to_failed_log_once() {
        let (db, worker_id) = setup().await;
        let item = submit_survey(&db, &worker_id, "5550102030").await;
        let processor = processor(
            &db,
            ScriptedCrm::new([failed("one"), failed("two"), failed("three")]),
            true,
        );

        for now in [2_000, 3_000] {
            processor.run_pass(now).await.unwrap();
        }
        let stats = processor.run_pass(4_000).await.unwrap();
        assert_eq!(stats.failed, 1);
        assert!(db.list_pending().await.unwrap().is_empty());

        let failed_items = db.list_failed(10).await.unwrap();
        assert_eq!(failed_items.len(), 1);
        assert_eq!(failed_items[0].record_id, item.record_id);
        assert_eq!(failed_items[0].last_error, "three");
        assert_eq!(failed_items[0].retry_count, 3);
        assert_eq!(failed_items[0].failed_at, 4_000);

        // Never retried automatically
        processor.run_pass(5_000).await.unwrap();
        assert_eq!(db.list_failed(10).await.unwrap().len(), 1);
        assert_eq!(processor.crm.call_count(), 3);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn offline_pass_leaves_queue_untouched() {
        let (db, worker_id) = setup().await;
        submit_survey(&db, &worker_id, "5550102030").await;
        submit_survey(&db, &worker_id, "5550102031").await;
        let before = db.list_pending().await.unwrap();

        let processor = processor(&db, ScriptedCrm::new([]), false);
        let stats = processor.process_queue(&before, 5_000).await.unwrap();
        assert_eq!(stats, SyncRunStats::default());
        assert_eq!(processor.run_pass(6_000).await.unwrap(), SyncRunStats::default());

        assert_eq!(db.list_pending().await.unwrap(), before);
        assert_eq!(processor.crm.call_count(), 0);
        assert!(db.list_sync_runs(10).await.unwrap().is_empty());
        assert_eq!(processor.probe.checks.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn items_are_sent_in_enqueue_order() {
        let (db, worker_id) = setup().await;
        for phone in ["5550100001", "5550100002", "5550100003"] {
            submit_survey(&db, &worker_id, phone).await;
        }

        let processor = processor(&db, ScriptedCrm::new([]), true);
        processor.run_pass(5_000).await.unwrap();

        let keys = processor
            .crm
            .calls
            .lock()
            .unwrap()
            .iter()
            .map(|call| call.natural_key.clone().unwrap_or_default())
            .collect::<Vec<_>>();
        assert_eq!(keys, vec!["5550100001", "5550100002", "5550100003"]);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn unmappable_payload_consumes_retry_budget() {
        let (db, worker_id) = setup().await;
        db.submit_record(RecordType::Appointment, &worker_id, json!({"unknown": 1}), 1_000)
            .await
            .unwrap();

        let processor = processor(&db, ScriptedCrm::new([]), true);
        let stats = processor.run_pass(2_000).await.unwrap();

        assert_eq!(stats.retried, 1);
        assert_eq!(processor.crm.call_count(), 0);
        let pending = db.list_pending().await.unwrap();
        assert!(pending[0]
            .last_error
            .as_deref()
            .is_some_and(|error| error.contains("no mapped fields")));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn empty_queue_writes_no_run_log() {
        let (db, _) = setup().await;
        let processor = processor(&db, ScriptedCrm::new([]), true);

        assert!(processor.run_pass(1_000).await.unwrap().is_empty());
        assert!(db.list_sync_runs(10).await.unwrap().is_empty());
    }
}
