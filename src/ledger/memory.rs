//! In-process ledger backend

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;

use chrono::{NaiveDate, Utc};

use super::{
    LedgerEntry, LedgerError, LedgerRecord, LedgerResult, LedgerStats, PeriodRecord, TopicLedger,
};
use crate::topic::TopicKey;

/// In-memory implementation of [`TopicLedger`]
///
/// Nothing survives the process. `set_fail_writes(true)` makes every append
/// fail, which is how persistence failures are exercised.
#[derive(Default)]
pub struct MemoryTopicLedger {
    entries: RwLock<Vec<LedgerEntry>>,
    periods: RwLock<Vec<PeriodRecord>>,
    fail_writes: AtomicBool,
}

impl MemoryTopicLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent appends fail with [`LedgerError::WriteRejected`]
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Number of one-shot entries
    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of the stored periodic entries
    pub fn periods(&self) -> LedgerResult<Vec<PeriodRecord>> {
        Ok(self
            .periods
            .read()
            .map_err(|_| LedgerError::Poisoned)?
            .clone())
    }

    fn check_writable(&self) -> LedgerResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(LedgerError::WriteRejected(
                "memory ledger is configured to reject writes".to_string(),
            ));
        }
        Ok(())
    }
}

impl TopicLedger for MemoryTopicLedger {
    fn contains(&self, key: &TopicKey) -> LedgerResult<bool> {
        let entries = self.entries.read().map_err(|_| LedgerError::Poisoned)?;
        Ok(entries.iter().any(|e| &e.record.key == key))
    }

    fn record(&self, record: &LedgerRecord) -> LedgerResult<()> {
        self.check_writable()?;

        let mut entries = self.entries.write().map_err(|_| LedgerError::Poisoned)?;
        let id = entries.len() as i64 + 1;
        entries.push(LedgerEntry {
            id,
            record: record.clone(),
            created_at: Utc::now(),
        });
        Ok(())
    }

    fn stats(&self) -> LedgerResult<LedgerStats> {
        let entries = self.entries.read().map_err(|_| LedgerError::Poisoned)?;
        let mut by_status = BTreeMap::new();
        for entry in entries.iter() {
            *by_status
                .entry(entry.record.status.as_str().to_string())
                .or_insert(0) += 1;
        }
        Ok(LedgerStats::from_counts(by_status))
    }

    fn recent(&self, limit: usize) -> LedgerResult<Vec<LedgerEntry>> {
        let entries = self.entries.read().map_err(|_| LedgerError::Poisoned)?;
        Ok(entries.iter().rev().take(limit).cloned().collect())
    }

    fn contains_period(&self, subject: &str, period_start: NaiveDate) -> LedgerResult<bool> {
        let periods = self.periods.read().map_err(|_| LedgerError::Poisoned)?;
        Ok(periods
            .iter()
            .any(|p| p.subject == subject && p.period_start == period_start))
    }

    fn record_period(&self, record: &PeriodRecord) -> LedgerResult<()> {
        self.check_writable()?;

        self.periods
            .write()
            .map_err(|_| LedgerError::Poisoned)?
            .push(record.clone());
        Ok(())
    }
}
