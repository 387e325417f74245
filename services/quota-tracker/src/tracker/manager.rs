use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::storage::{QuotaStore, UsageRow};

use super::error::QuotaError;
use super::usage::{QuotaDecision, UsageSnapshot};

/// Decides whether a user may spend one request of their daily allowance.
///
/// Every decision runs against the backing store through conditional
/// statements, so concurrent consumes for the same user cannot overshoot the
/// limit and a day rollover resets the window exactly once. The limit itself
/// is fixed at construction; it is the same for every user.
#[derive(Clone)]
pub struct QuotaTracker {
    store: Arc<QuotaStore>,
    daily_limit: u64,
}

impl QuotaTracker {
    pub fn new(store: Arc<QuotaStore>, daily_limit: u64) -> Self {
        Self { store, daily_limit }
    }

    pub fn daily_limit(&self) -> u64 {
        self.daily_limit
    }

    /// Attempts to consume one request for `user_id` against today's window.
    pub fn consume(&self, user_id: &str) -> Result<QuotaDecision, QuotaError> {
        self.consume_at(user_id, Utc::now())
    }

    /// Same as [`consume`](Self::consume) with an explicit clock, so day
    /// boundaries can be crossed deterministically in tests.
    ///
    /// A denial never writes anything: the record the user ends the day with
    /// is exactly the record they hit the limit with. A day rollover is
    /// persisted even when the request that triggered it is denied.
    pub fn consume_at(
        &self,
        user_id: &str,
        now: DateTime<Utc>,
    ) -> Result<QuotaDecision, QuotaError> {
        validate_user_id(user_id)?;

        let mut existing = self.store.fetch(user_id)?;
        if existing.is_none() {
            if let Some(created) = self.store.try_create(user_id, now)? {
                debug!(user_id, "created usage record on first consume");
                return Ok(QuotaDecision::allow(self.remaining_after(&created)));
            }
            // Lost the first-consume race; read what the winner wrote.
            existing = self.store.fetch(user_id)?;
        }

        if let Some(row) = &existing {
            if !same_utc_day(row.last_reset_at, now) {
                // The compare on last_reset_at makes the reset apply once
                // per rollover even when several requests observe the stale
                // day together.
                if self.store.reset_window(user_id, row.last_reset_at, now)? {
                    debug!(user_id, "reset daily window");
                }
            }
        }

        match self.store.increment_below(user_id, self.daily_limit, now)? {
            Some(updated) => Ok(QuotaDecision::allow(self.remaining_after(&updated))),
            None => {
                debug!(user_id, limit = self.daily_limit, "daily quota exhausted");
                Ok(QuotaDecision::deny())
            }
        }
    }

    /// Reads a user's usage without consuming. Returns `None` for users who
    /// have never consumed.
    pub fn usage(&self, user_id: &str) -> Result<Option<UsageSnapshot>, QuotaError> {
        self.usage_at(user_id, Utc::now())
    }

    pub fn usage_at(
        &self,
        user_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<UsageSnapshot>, QuotaError> {
        validate_user_id(user_id)?;
        let row = self.store.fetch(user_id)?;
        Ok(row.map(|row| self.snapshot(row, now)))
    }

    pub fn all_usage(&self) -> Result<Vec<UsageSnapshot>, QuotaError> {
        let now = Utc::now();
        let rows = self.store.list_all()?;
        Ok(rows.into_iter().map(|row| self.snapshot(row, now)).collect())
    }

    pub fn tracked_users(&self) -> Result<u64, QuotaError> {
        Ok(self.store.count()?)
    }

    fn snapshot(&self, row: UsageRow, now: DateTime<Utc>) -> UsageSnapshot {
        let requests_today = if same_utc_day(row.last_reset_at, now) {
            row.requests_today
        } else {
            0
        };

        UsageSnapshot {
            user_id: row.user_id,
            requests_today,
            requests_total: row.requests_total,
            remaining: self.daily_limit.saturating_sub(requests_today),
            last_reset_at: row.last_reset_at,
        }
    }

    fn remaining_after(&self, row: &UsageRow) -> u64 {
        self.daily_limit.saturating_sub(row.requests_today)
    }
}

fn validate_user_id(user_id: &str) -> Result<(), QuotaError> {
    if user_id.trim().is_empty() {
        return Err(QuotaError::InvalidUserId);
    }
    Ok(())
}

/// Two instants share a quota window when they fall on the same UTC
/// calendar date. Elapsed time is irrelevant: 23:59 and 00:01 are different
/// windows one minute apart.
fn same_utc_day(a: DateTime<Utc>, b: DateTime<Utc>) -> bool {
    a.date_naive() == b.date_naive()
}
