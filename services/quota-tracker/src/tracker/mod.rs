pub mod error;
pub mod manager;
pub mod usage;

pub use error::QuotaError;
pub use manager::QuotaTracker;
pub use usage::{QuotaDecision, UsageSnapshot};
