//! HTTP client for the quota tracker service.
//!
//! The chat API calls [`QuotaClient::consume`] exactly once per accepted
//! message request, before any generation work starts. A denied decision is
//! a hard stop the caller surfaces to the end user as HTTP 429:
//!
//! ```no_run
//! # async fn handle_message() -> anyhow::Result<()> {
//! use banter_quota_client::QuotaClient;
//!
//! let quota = QuotaClient::new("http://127.0.0.1:8183")?;
//! let decision = quota.consume("user-42").await?;
//! if !decision.allowed {
//!     // Respond 429 Too Many Requests; no generation happens.
//!     return Ok(());
//! }
//! // ... generate the reply ...
//! # Ok(())
//! # }
//! ```
//!
//! Transport failures and non-success statuses are errors, not decisions.
//! Callers must fail closed on them: an unreachable quota service means the
//! request is refused, never waved through.

use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};

/// Outcome of one consume attempt, as served by the quota tracker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotaDecision {
    pub allowed: bool,
    pub remaining: u64,
}

/// A user's usage as reported by the quota tracker's read endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsageSnapshot {
    pub user_id: String,
    pub requests_today: u64,
    pub requests_total: u64,
    pub remaining: u64,
    pub last_reset_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct QuotaClient {
    http_client: Client,
    base_url: String,
}

impl QuotaClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(5))
            .build()
            .context("failed to build quota tracker client")?;

        Ok(Self {
            http_client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// Spends one request of `user_id`'s daily allowance.
    ///
    /// Returns the tracker's decision; `allowed == false` means the user is
    /// over their daily limit and the caller must refuse the request.
    pub async fn consume(&self, user_id: &str) -> Result<QuotaDecision> {
        let url = format!("{}/api/quota/consume", self.base_url);
        let response = self
            .http_client
            .post(&url)
            .json(&ConsumeRequest { user_id })
            .send()
            .await
            .with_context(|| format!("failed to reach quota service at {}", url))?;

        if response.status().is_success() {
            response
                .json::<QuotaDecision>()
                .await
                .context("failed to parse quota decision")
        } else {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "unable to read error body".to_string());
            anyhow::bail!(
                "quota service responded with {} for POST {}: {}",
                status,
                url,
                body
            );
        }
    }

    /// Reads `user_id`'s usage without consuming anything. Returns `None`
    /// for users the tracker has never seen.
    pub async fn usage(&self, user_id: &str) -> Result<Option<UsageSnapshot>> {
        let url = format!("{}/api/quota/{}", self.base_url, user_id);
        let response = self
            .http_client
            .get(&url)
            .send()
            .await
            .with_context(|| format!("failed to fetch quota usage from {}", url))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        if response.status().is_success() {
            let snapshot = response
                .json::<UsageSnapshot>()
                .await
                .context("failed to parse quota usage response")?;
            Ok(Some(snapshot))
        } else {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "unable to read error body".to_string());
            anyhow::bail!(
                "quota service responded with {} for GET {}: {}",
                status,
                url,
                body
            );
        }
    }
}

#[derive(Debug, Serialize)]
struct ConsumeRequest<'a> {
    user_id: &'a str,
}
