//! SQLite ledger backend
//!
//! Every append runs in its own transaction and is committed before the call
//! returns, with `synchronous=FULL` so a committed entry survives a crash.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, Connection};

use super::{
    EntryStatus, LedgerEntry, LedgerError, LedgerRecord, LedgerResult, LedgerStats,
    PeriodRecord, TopicLedger,
};
use crate::topic::TopicKey;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// A `published_topics` row as stored, before status and timestamp parsing
struct StoredEntry {
    id: i64,
    key: TopicKey,
    title: String,
    post_id: Option<i64>,
    post_url: Option<String>,
    status: String,
    created_at: String,
    error: Option<String>,
}

impl StoredEntry {
    fn decode(self) -> LedgerResult<LedgerEntry> {
        let id = self.id;
        let corrupt = |reason: String| LedgerError::CorruptRow { id, reason };

        let status: EntryStatus = self.status.parse().map_err(corrupt)?;
        let created_at = DateTime::parse_from_rfc3339(&self.created_at)
            .map_err(|e| corrupt(format!("invalid created_at '{}': {e}", self.created_at)))?
            .with_timezone(&Utc);

        Ok(LedgerEntry {
            id,
            record: LedgerRecord {
                key: self.key,
                title: self.title,
                post_id: self.post_id.map(|id| id as u64),
                post_url: self.post_url,
                status,
                error: self.error,
            },
            created_at,
        })
    }
}

/// SQLite implementation of [`TopicLedger`]
///
/// Uses `Mutex` to ensure thread-safety for the SQLite connection.
pub struct SqliteTopicLedger {
    conn: Mutex<Connection>,
}

impl SqliteTopicLedger {
    /// Open (or create) the ledger database at `path`
    pub fn open(path: impl AsRef<Path>) -> LedgerResult<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|source| LedgerError::Io {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
        }

        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=FULL;")?;

        let ledger = Self {
            conn: Mutex::new(conn),
        };
        ledger.create_schema()?;

        tracing::info!(path = %path.display(), "SQLite ledger initialized");
        Ok(ledger)
    }

    /// Create in-memory ledger (for testing)
    pub fn in_memory() -> LedgerResult<Self> {
        let conn = Connection::open_in_memory()?;
        let ledger = Self {
            conn: Mutex::new(conn),
        };
        ledger.create_schema()?;
        Ok(ledger)
    }

    fn lock(&self) -> LedgerResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| LedgerError::Poisoned)
    }

    fn create_schema(&self) -> LedgerResult<()> {
        let conn = self.lock()?;
        conn.execute_batch(
            r#"
                CREATE TABLE IF NOT EXISTS published_topics (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    primary_type TEXT NOT NULL,
                    situation TEXT NOT NULL,
                    card_name TEXT NOT NULL,
                    title TEXT NOT NULL,
                    post_id INTEGER,
                    post_url TEXT,
                    status TEXT NOT NULL,
                    created_at TEXT NOT NULL,
                    error_message TEXT
                );

                CREATE INDEX IF NOT EXISTS idx_topic_combination
                    ON published_topics(primary_type, situation, card_name);

                CREATE TABLE IF NOT EXISTS weekly_fortunes (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    subject TEXT NOT NULL,
                    week_start TEXT NOT NULL,
                    week_end TEXT NOT NULL,
                    title TEXT NOT NULL,
                    post_id INTEGER,
                    post_url TEXT,
                    status TEXT NOT NULL,
                    created_at TEXT NOT NULL,
                    error_message TEXT
                );

                CREATE INDEX IF NOT EXISTS idx_weekly_fortune
                    ON weekly_fortunes(subject, week_start);
                "#,
        )?;

        Ok(())
    }
}

impl TopicLedger for SqliteTopicLedger {
    fn contains(&self, key: &TopicKey) -> LedgerResult<bool> {
        let conn = self.lock()?;
        let exists: bool = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM published_topics
                 WHERE primary_type = ?1 AND situation = ?2 AND card_name = ?3)",
            params![key.primary, key.situation, key.card_name],
            |row| row.get(0),
        )?;

        Ok(exists)
    }

    fn record(&self, record: &LedgerRecord) -> LedgerResult<()> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        tx.execute(
            r#"
                INSERT INTO published_topics
                    (primary_type, situation, card_name, title, post_id, post_url,
                     status, created_at, error_message)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                "#,
            params![
                record.key.primary,
                record.key.situation,
                record.key.card_name,
                record.title,
                record.post_id.map(|id| id as i64),
                record.post_url,
                record.status.as_str(),
                Utc::now().to_rfc3339(),
                record.error,
            ],
        )?;
        tx.commit()?;

        tracing::debug!(key = %record.key, status = %record.status, "Ledger entry recorded");
        Ok(())
    }

    fn stats(&self) -> LedgerResult<LedgerStats> {
        let conn = self.lock()?;
        let mut stmt =
            conn.prepare("SELECT status, COUNT(*) FROM published_topics GROUP BY status")?;

        let mut by_status = BTreeMap::new();
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
        })?;
        for row in rows {
            let (status, count) = row?;
            by_status.insert(status, count as usize);
        }

        Ok(LedgerStats::from_counts(by_status))
    }

    fn recent(&self, limit: usize) -> LedgerResult<Vec<LedgerEntry>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT id, primary_type, situation, card_name, title, post_id, post_url,
                    status, created_at, error_message
             FROM published_topics ORDER BY id DESC LIMIT ?1",
        )?;

        let rows = stmt
            .query_map(params![limit as i64], |row| {
                Ok(StoredEntry {
                    id: row.get(0)?,
                    key: TopicKey {
                        primary: row.get(1)?,
                        situation: row.get(2)?,
                        card_name: row.get(3)?,
                    },
                    title: row.get(4)?,
                    post_id: row.get(5)?,
                    post_url: row.get(6)?,
                    status: row.get(7)?,
                    created_at: row.get(8)?,
                    error: row.get(9)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter().map(StoredEntry::decode).collect()
    }

    fn contains_period(&self, subject: &str, period_start: NaiveDate) -> LedgerResult<bool> {
        let conn = self.lock()?;
        let exists: bool = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM weekly_fortunes WHERE subject = ?1 AND week_start = ?2)",
            params![subject, period_start.format(DATE_FORMAT).to_string()],
            |row| row.get(0),
        )?;

        Ok(exists)
    }

    fn record_period(&self, record: &PeriodRecord) -> LedgerResult<()> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        tx.execute(
            r#"
                INSERT INTO weekly_fortunes
                    (subject, week_start, week_end, title, post_id, post_url,
                     status, created_at, error_message)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                "#,
            params![
                record.subject,
                record.period_start.format(DATE_FORMAT).to_string(),
                record.period_end.format(DATE_FORMAT).to_string(),
                record.title,
                record.post_id.map(|id| id as i64),
                record.post_url,
                record.status.as_str(),
                Utc::now().to_rfc3339(),
                record.error,
            ],
        )?;
        tx.commit()?;

        Ok(())
    }
}
