//! Rejection-sampling topic allocator
//!
//! Draws each dimension uniformly and independently (primary, situation,
//! card kind, then a card within that kind), checks the ledger for the
//! deduplication key, and redraws on collision. The probe count is capped so
//! a nearly exhausted pool is reported instead of looping forever.
//!
//! Allocation does not reserve anything. The key only becomes unavailable
//! once the pipeline writes a ledger entry for it, so two runs sharing a
//! ledger must be serialized externally.

use rand::Rng;
use serde::Serialize;

use super::{Topic, TopicError, TopicSpace};
use crate::ledger::TopicLedger;
use crate::metrics;

/// Probe bound before reporting exhaustion
pub const DEFAULT_MAX_ATTEMPTS: u32 = 100;

/// Capacity view of the topic pool
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PoolStatus {
    pub total: usize,
    pub used: usize,
    pub remaining: usize,
    pub utilization_percent: f64,
}

/// Allocates topics that have never been recorded in the ledger
///
/// The random source is injected so a seeded generator yields a
/// reproducible draw sequence.
pub struct TopicAllocator<R> {
    space: TopicSpace,
    rng: R,
    max_attempts: u32,
}

impl<R: Rng> TopicAllocator<R> {
    /// Create an allocator with the default probe bound
    pub fn new(space: TopicSpace, rng: R) -> Self {
        Self {
            space,
            rng,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }

    /// Override the probe bound
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    pub fn space(&self) -> &TopicSpace {
        &self.space
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Access the random source (shared with slot scheduling)
    pub fn rng_mut(&mut self) -> &mut R {
        &mut self.rng
    }

    /// Draw a topic whose key is not in the ledger
    ///
    /// # Errors
    ///
    /// Returns [`TopicError::Exhausted`] when every probe collides, or
    /// [`TopicError::Ledger`] when the membership query fails.
    pub fn allocate(&mut self, ledger: &dyn TopicLedger) -> Result<Topic, TopicError> {
        for attempt in 1..=self.max_attempts {
            let topic = self.draw();

            if !ledger.contains(&topic.key())? {
                tracing::info!(
                    primary = %topic.primary,
                    situation = %topic.situation,
                    card_kind = %topic.card_kind,
                    card = %topic.card.name,
                    attempt,
                    "Allocated unique topic"
                );
                metrics::record_allocation(attempt, true);
                return Ok(topic);
            }

            tracing::debug!(attempt, key = %topic.key(), "Topic already used, redrawing");
        }

        tracing::error!(
            max_attempts = self.max_attempts,
            "Failed to allocate a unique topic"
        );
        metrics::record_allocation(self.max_attempts, false);

        Err(TopicError::Exhausted {
            attempts: self.max_attempts,
        })
    }

    /// Report how much of the pool has been consumed
    pub fn pool_status(&self, ledger: &dyn TopicLedger) -> Result<PoolStatus, TopicError> {
        let total = self.space.total_combinations();
        let used = ledger.stats()?.total;
        let remaining = total.saturating_sub(used);
        let utilization_percent = if total == 0 {
            0.0
        } else {
            ((used as f64 / total as f64) * 10_000.0).round() / 100.0
        };

        tracing::info!(total, used, remaining, utilization_percent, "Topic pool status");

        Ok(PoolStatus {
            total,
            used,
            remaining,
            utilization_percent,
        })
    }

    /// One independent draw of every dimension
    fn draw(&mut self) -> Topic {
        let space = &self.space;
        let rng = &mut self.rng;

        let primary = &space.primaries[rng.gen_range(0..space.primaries.len())];
        let situation = &space.situations[rng.gen_range(0..space.situations.len())];
        let (kind, cards) = &space.decks[rng.gen_range(0..space.decks.len())];
        let card = &cards[rng.gen_range(0..cards.len())];

        Topic {
            primary: primary.clone(),
            situation: situation.clone(),
            card_kind: *kind,
            card: card.clone(),
        }
    }
}
