//! Inactivity detection, supervisor escalation and admin actions.

pub mod admin;
pub mod detector;
pub mod escalation;
pub mod service;

pub use admin::InactivityAdmin;
pub use detector::{describe_inactivity, resolve_last_activity, InactivityDetector};
pub use escalation::{EscalationMonitor, EscalationSummary, NotificationState};
pub use service::InactivityService;
