//! In-process fakes for the CRM and reachability boundaries.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use crate::config::MappedRecord;

use super::crm::{CrmClient, DeliveryOutcome};
use super::reachability::ReachabilityProbe;

/// Replays scripted outcomes, then delivers everything.
pub struct ScriptedCrm {
    outcomes: Mutex<VecDeque<DeliveryOutcome>>,
    pub calls: Mutex<Vec<MappedRecord>>,
}

impl ScriptedCrm {
    pub fn new(outcomes: impl IntoIterator<Item = DeliveryOutcome>) -> Self {
        Self {
            outcomes: Mutex::new(outcomes.into_iter().collect()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

impl CrmClient for ScriptedCrm {
    async fn create_record(&self, record: &MappedRecord) -> DeliveryOutcome {
        self.calls.lock().unwrap().push(record.clone());
        self.outcomes
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(DeliveryOutcome::Delivered { remote_id: None })
    }
}

pub struct FixedProbe {
    pub online: AtomicBool,
    pub checks: AtomicUsize,
}

impl FixedProbe {
    pub const fn new(online: bool) -> Self {
        Self {
            online: AtomicBool::new(online),
            checks: AtomicUsize::new(0),
        }
    }
}

impl ReachabilityProbe for FixedProbe {
    async fn is_reachable(&self) -> bool {
        self.checks.fetch_add(1, Ordering::SeqCst);
        self.online.load(Ordering::SeqCst)
    }
}
