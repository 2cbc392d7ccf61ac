//! CRM sync queue: remote clients, the queue processor and its background service.

pub mod crm;
pub mod processor;
pub mod reachability;
pub mod service;

#[cfg(test)]
pub(crate) mod testing;

pub use crm::{
    ConfiguredCrm, CrmClient, CrmError, CrmResult, DeliveryOutcome, SalesforceClient,
    ZapierClient,
};
pub use processor::SyncQueueProcessor;
pub use reachability::{HttpReachabilityProbe, ReachabilityProbe};
pub use service::SyncService;
