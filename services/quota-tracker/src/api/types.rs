use serde::{Deserialize, Serialize};

use crate::tracker::QuotaDecision;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsumeQuotaRequest {
    pub user_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsumeQuotaResponse {
    pub allowed: bool,
    pub remaining: u64,
}

impl From<QuotaDecision> for ConsumeQuotaResponse {
    fn from(decision: QuotaDecision) -> Self {
        Self {
            allowed: decision.allowed,
            remaining: decision.remaining,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
    pub details: Option<serde_json::Value>,
}
