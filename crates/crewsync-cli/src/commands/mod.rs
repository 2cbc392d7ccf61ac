pub mod common;
pub mod completions;
pub mod config;
pub mod inactive;
pub mod queue;
pub mod record;
pub mod run;
pub mod shift;
pub mod worker;
