//! Service layer shared by the CLI and the background loops.

pub(crate) mod background;
pub mod database;

pub use database::DatabaseService;
