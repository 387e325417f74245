pub mod database;
pub mod error;
pub mod schema;

pub use database::{QuotaStore, UsageRow};
pub use error::StorageError;

pub const QUOTA_DB_FILENAME: &str = "quotas.db";
