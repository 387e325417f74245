pub mod api;
pub mod config;
pub mod storage;
pub mod tracker;

pub use api::{create_router, ApiState, ConsumeQuotaRequest, ConsumeQuotaResponse, ErrorResponse};
pub use config::{normalize_daily_limit, QuotaTrackerConfig, DEFAULT_DAILY_LIMIT, MAX_DAILY_LIMIT};
pub use storage::{QuotaStore, StorageError, UsageRow};
pub use tracker::{QuotaDecision, QuotaError, QuotaTracker, UsageSnapshot};
