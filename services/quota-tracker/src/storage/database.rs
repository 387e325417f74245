use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard};

use anyhow::Result;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};

use super::error::StorageError;
use super::schema::init_database;
use super::QUOTA_DB_FILENAME;

/// One row of the `usage_quotas` table.
#[derive(Debug, Clone, PartialEq)]
pub struct UsageRow {
    pub user_id: String,
    pub requests_today: u64,
    pub requests_total: u64,
    pub last_reset_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub struct QuotaStore {
    conn: Mutex<Connection>,
}

impl QuotaStore {
    pub fn new(data_dir: PathBuf) -> Result<Self> {
        std::fs::create_dir_all(&data_dir)?;
        let db_path = data_dir.join(QUOTA_DB_FILENAME);
        let is_new = !db_path.exists();
        let conn = Connection::open(&db_path)?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.pragma_update(None, "journal_mode", "WAL")?;

        if is_new {
            init_database(&conn)?;
        }

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn fetch(&self, user_id: &str) -> Result<Option<UsageRow>, StorageError> {
        let conn = self.lock()?;

        let mut stmt = conn.prepare(
            r#"
            SELECT user_id, requests_today, requests_total, last_reset_at, created_at, updated_at
            FROM usage_quotas
            WHERE user_id = ?1
            "#,
        )?;

        let row = stmt.query_row(params![user_id], map_usage_row).optional()?;
        Ok(row)
    }

    /// Inserts the row for a user's first consume, already charged with one
    /// request. Returns `None` when the row exists, including when a
    /// concurrent caller created it between our fetch and this insert.
    pub fn try_create(
        &self,
        user_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<UsageRow>, StorageError> {
        let conn = self.lock()?;

        let mut stmt = conn.prepare(
            r#"
            INSERT INTO usage_quotas (user_id, requests_today, requests_total, last_reset_at, created_at, updated_at)
            VALUES (?1, 1, 1, ?2, ?2, ?2)
            ON CONFLICT(user_id) DO NOTHING
            RETURNING user_id, requests_today, requests_total, last_reset_at, created_at, updated_at
            "#,
        )?;

        let row = stmt
            .query_row(params![user_id, now.to_rfc3339()], map_usage_row)
            .optional()?;
        Ok(row)
    }

    /// Zeroes `requests_today` for a new calendar day. The update only
    /// applies while `last_reset_at` still matches the value the caller
    /// observed, so concurrent callers crossing the same day boundary reset
    /// the window at most once. Returns whether this call performed the
    /// reset.
    pub fn reset_window(
        &self,
        user_id: &str,
        seen_reset_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<bool, StorageError> {
        let conn = self.lock()?;

        let changed = conn.execute(
            r#"
            UPDATE usage_quotas
            SET requests_today = 0, last_reset_at = ?3, updated_at = ?3
            WHERE user_id = ?1 AND last_reset_at = ?2
            "#,
            params![user_id, seen_reset_at.to_rfc3339(), now.to_rfc3339()],
        )?;

        Ok(changed == 1)
    }

    /// Charges one request if and only if the user is still below `limit`.
    /// The guard and the increment are a single statement, so the stored
    /// count can never pass the limit no matter how many callers race.
    /// Returns the updated row, or `None` when the user was already at the
    /// limit and nothing was written.
    ///
    /// `last_reset_at` is left untouched: only [`reset_window`] and
    /// [`try_create`] write it, which keeps it usable as the version token
    /// in `reset_window`'s condition.
    ///
    /// [`reset_window`]: Self::reset_window
    /// [`try_create`]: Self::try_create
    pub fn increment_below(
        &self,
        user_id: &str,
        limit: u64,
        now: DateTime<Utc>,
    ) -> Result<Option<UsageRow>, StorageError> {
        let conn = self.lock()?;

        let mut stmt = conn.prepare(
            r#"
            UPDATE usage_quotas
            SET requests_today = requests_today + 1,
                requests_total = requests_total + 1,
                updated_at = ?3
            WHERE user_id = ?1 AND requests_today < ?2
            RETURNING user_id, requests_today, requests_total, last_reset_at, created_at, updated_at
            "#,
        )?;

        let row = stmt
            .query_row(
                params![user_id, limit as i64, now.to_rfc3339()],
                map_usage_row,
            )
            .optional()?;
        Ok(row)
    }

    pub fn list_all(&self) -> Result<Vec<UsageRow>, StorageError> {
        let conn = self.lock()?;

        let mut stmt = conn.prepare(
            r#"
            SELECT user_id, requests_today, requests_total, last_reset_at, created_at, updated_at
            FROM usage_quotas
            ORDER BY user_id
            "#,
        )?;

        let rows = stmt.query_map([], map_usage_row)?;

        let mut usage = Vec::new();
        for row in rows {
            usage.push(row?);
        }
        Ok(usage)
    }

    pub fn count(&self) -> Result<u64, StorageError> {
        let conn = self.lock()?;
        let count: i64 =
            conn.query_row("SELECT COUNT(*) FROM usage_quotas", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, StorageError> {
        self.conn.lock().map_err(|_| StorageError::LockPoisoned)
    }
}

fn map_usage_row(row: &Row<'_>) -> rusqlite::Result<UsageRow> {
    Ok(UsageRow {
        user_id: row.get(0)?,
        requests_today: row.get::<_, i64>(1)? as u64,
        requests_total: row.get::<_, i64>(2)? as u64,
        last_reset_at: row.get(3)?,
        created_at: row.get(4)?,
        updated_at: row.get(5)?,
    })
}
