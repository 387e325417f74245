use anyhow::Result;
use rusqlite::Connection;

pub const USAGE_QUOTAS_TABLE_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS usage_quotas (
    user_id TEXT PRIMARY KEY,
    requests_today INTEGER NOT NULL,
    requests_total INTEGER NOT NULL,
    last_reset_at TEXT NOT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);
"#;

pub fn init_database(conn: &Connection) -> Result<()> {
    conn.execute_batch(USAGE_QUOTAS_TABLE_SCHEMA)?;
    Ok(())
}
