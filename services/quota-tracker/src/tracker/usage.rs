use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Outcome of a single consume attempt.
///
/// A denial is an ordinary value, not an error: callers are expected to map
/// `allowed == false` to their own refusal path (the chat API returns HTTP
/// 429 from it).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotaDecision {
    pub allowed: bool,
    pub remaining: u64,
}

impl QuotaDecision {
    pub fn allow(remaining: u64) -> Self {
        Self {
            allowed: true,
            remaining,
        }
    }

    pub fn deny() -> Self {
        Self {
            allowed: false,
            remaining: 0,
        }
    }
}

/// A user's usage as seen through the current day window.
///
/// When the stored record belongs to an earlier calendar day the snapshot
/// reports `requests_today` as zero and a full `remaining`, while the stored
/// row stays untouched until the next consume performs the actual reset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsageSnapshot {
    pub user_id: String,
    pub requests_today: u64,
    pub requests_total: u64,
    pub remaining: u64,
    pub last_reset_at: DateTime<Utc>,
}
