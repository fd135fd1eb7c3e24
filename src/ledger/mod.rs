//! Duplicate ledger for published topics
//!
//! The ledger is the single source of truth for duplicate prevention. It is
//! append-only: entries are never updated or deleted, and an entry is written
//! for every topic that reached publication, whether it succeeded or failed.
//!
//! ```text
//! ┌──────────────┐  contains(key)   ┌──────────────────────┐
//! │  Allocator   │─────────────────▶│                      │
//! └──────────────┘                  │     TopicLedger      │
//! ┌──────────────┐  record(entry)   │                      │
//! │ Coordinator  │─────────────────▶│  published_topics    │
//! └──────────────┘                  │  weekly_fortunes     │
//! ┌──────────────┐  *_period(..)    │                      │
//! │   Weekly     │─────────────────▶│                      │
//! └──────────────┘                  └──────────┬───────────┘
//!                                   ┌──────────┴───────────┐
//!                                   ▼                      ▼
//!                           SqliteTopicLedger      MemoryTopicLedger
//! ```

pub mod memory;
pub mod sqlite;

pub use memory::MemoryTopicLedger;
pub use sqlite::SqliteTopicLedger;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;

use crate::cms::PostStatus;
use crate::topic::TopicKey;

// ============================================================================
// Errors
// ============================================================================

/// Ledger storage errors
#[derive(Error, Debug)]
pub enum LedgerError {
    /// SQLite failure
    #[error("Ledger database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Could not prepare the storage location
    #[error("Failed to prepare ledger storage at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A thread panicked while holding the ledger lock
    #[error("Ledger lock poisoned")]
    Poisoned,

    /// The backend refused the write
    #[error("Ledger write rejected: {0}")]
    WriteRejected(String),

    /// A stored row cannot be decoded
    #[error("Corrupt ledger row {id}: {reason}")]
    CorruptRow { id: i64, reason: String },
}

/// Result type for ledger operations
pub type LedgerResult<T> = Result<T, LedgerError>;

// ============================================================================
// Core Types
// ============================================================================

/// Status stored with each ledger entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryStatus {
    Draft,
    Published,
    Scheduled,
    Failed,
}

impl EntryStatus {
    /// Convert to string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryStatus::Draft => "draft",
            EntryStatus::Published => "published",
            EntryStatus::Scheduled => "scheduled",
            EntryStatus::Failed => "failed",
        }
    }

    /// Whether the attempt produced a post
    pub fn is_success(&self) -> bool {
        !matches!(self, EntryStatus::Failed)
    }
}

impl std::str::FromStr for EntryStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "draft" => Ok(EntryStatus::Draft),
            "published" | "publish" => Ok(EntryStatus::Published),
            "scheduled" | "future" => Ok(EntryStatus::Scheduled),
            "failed" => Ok(EntryStatus::Failed),
            other => Err(format!("unknown entry status: {other}")),
        }
    }
}

impl std::fmt::Display for EntryStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<PostStatus> for EntryStatus {
    fn from(status: PostStatus) -> Self {
        match status {
            PostStatus::Draft => EntryStatus::Draft,
            PostStatus::Publish => EntryStatus::Published,
            PostStatus::Future => EntryStatus::Scheduled,
        }
    }
}

/// A new one-shot topic entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerRecord {
    pub key: TopicKey,
    pub title: String,
    pub post_id: Option<u64>,
    pub post_url: Option<String>,
    pub status: EntryStatus,
    pub error: Option<String>,
}

impl LedgerRecord {
    /// Record without a post reference or error
    pub fn new(key: TopicKey, title: impl Into<String>, status: EntryStatus) -> Self {
        Self {
            key,
            title: title.into(),
            post_id: None,
            post_url: None,
            status,
            error: None,
        }
    }

    /// Attach the created post
    pub fn with_post(mut self, post_id: u64, post_url: impl Into<String>) -> Self {
        self.post_id = Some(post_id);
        self.post_url = Some(post_url.into());
        self
    }

    /// Attach the failure reason
    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }
}

/// A stored one-shot topic entry
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LedgerEntry {
    pub id: i64,
    pub record: LedgerRecord,
    pub created_at: DateTime<Utc>,
}

/// Entry for periodic (weekly) content, keyed by `(subject, period_start)`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeriodRecord {
    pub subject: String,
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    pub title: String,
    pub post_id: Option<u64>,
    pub post_url: Option<String>,
    pub status: EntryStatus,
    pub error: Option<String>,
}

/// Aggregate ledger view for capacity planning
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LedgerStats {
    pub total: usize,
    pub by_status: BTreeMap<String, usize>,
    /// Share of non-failed entries, in percent
    pub success_rate: f64,
}

impl LedgerStats {
    /// Build stats from per-status counts
    pub fn from_counts(by_status: BTreeMap<String, usize>) -> Self {
        let total: usize = by_status.values().sum();
        let failed = by_status
            .get(EntryStatus::Failed.as_str())
            .copied()
            .unwrap_or(0);
        let success_rate = if total == 0 {
            0.0
        } else {
            (((total - failed) as f64 / total as f64) * 10_000.0).round() / 100.0
        };

        Self {
            total,
            by_status,
            success_rate,
        }
    }

    /// Count for one status
    pub fn count(&self, status: EntryStatus) -> usize {
        self.by_status.get(status.as_str()).copied().unwrap_or(0)
    }
}

// ============================================================================
// Ledger Trait
// ============================================================================

/// Durable, append-only record of used topics and periods
pub trait TopicLedger: Send + Sync {
    /// Whether any entry exists for the key, regardless of status
    fn contains(&self, key: &TopicKey) -> LedgerResult<bool>;

    /// Append one entry; a successful return means the entry is durable
    fn record(&self, record: &LedgerRecord) -> LedgerResult<()>;

    /// Aggregate counts
    fn stats(&self) -> LedgerResult<LedgerStats>;

    /// Most recent entries first
    fn recent(&self, limit: usize) -> LedgerResult<Vec<LedgerEntry>>;

    /// Whether the subject already has an entry for the period
    fn contains_period(&self, subject: &str, period_start: NaiveDate) -> LedgerResult<bool>;

    /// Append one periodic entry
    fn record_period(&self, record: &PeriodRecord) -> LedgerResult<()>;
}

/// Thread-safe shared ledger
pub type SharedTopicLedger = Arc<dyn TopicLedger>;

/// Open the SQLite ledger at `path` as a shared handle
pub fn open_sqlite_ledger(path: impl AsRef<std::path::Path>) -> LedgerResult<SharedTopicLedger> {
    Ok(Arc::new(SqliteTopicLedger::open(path)?))
}
