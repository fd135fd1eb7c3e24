//! Topic space and unique topic allocation
//!
//! A topic is one combination of personality type, relationship situation and
//! symbolic card. The deduplication key deliberately leaves out the card kind:
//! the ledger stores `(primary, situation, card_name)`, so a [`TopicSpace`]
//! refuses decks whose card names collide across kinds instead of relying on
//! that by convention.
//!
//! # Modules
//!
//! - [`data`] - Built-in vocabulary (MBTI types, situations, card decks)
//! - [`allocator`] - Rejection-sampling allocator backed by the ledger

pub mod allocator;
pub mod data;

pub use allocator::{PoolStatus, TopicAllocator, DEFAULT_MAX_ATTEMPTS};

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

use crate::ledger::LedgerError;

// ============================================================================
// Errors
// ============================================================================

/// Errors raised while building a topic space or allocating from it
#[derive(Error, Debug)]
pub enum TopicError {
    /// Every probe within the attempt bound hit an already used key
    #[error("Unable to find an unused topic after {attempts} attempts; the topic pool may be exhausted")]
    Exhausted { attempts: u32 },

    /// A dimension of the space has no values
    #[error("Topic dimension '{0}' is empty")]
    EmptyDimension(&'static str),

    /// The same card name appears more than once across decks
    #[error("Card name '{name}' appears in both {first} and {second} decks")]
    AmbiguousCard {
        name: String,
        first: CardKind,
        second: CardKind,
    },

    /// Membership lookup failed
    #[error("Ledger lookup failed: {0}")]
    Ledger(#[from] LedgerError),
}

impl TopicError {
    /// Only ledger read failures are worth retrying
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Ledger(_))
    }
}

// ============================================================================
// Core Types
// ============================================================================

/// Symbolic card vocabularies a topic can draw from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CardKind {
    Tarot,
    Numerology,
    Oracle,
}

impl CardKind {
    /// Every kind, in draw order
    pub const ALL: [CardKind; 3] = [CardKind::Tarot, CardKind::Numerology, CardKind::Oracle];

    /// Convert to string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            CardKind::Tarot => "tarot",
            CardKind::Numerology => "numerology",
            CardKind::Oracle => "oracle",
        }
    }

    /// Korean label used in prompts and copy
    pub fn korean_label(&self) -> &'static str {
        match self {
            CardKind::Tarot => "타로",
            CardKind::Numerology => "수비학",
            CardKind::Oracle => "오라클 카드",
        }
    }
}

impl fmt::Display for CardKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single card with its Korean display name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Card {
    pub name: String,
    pub korean: String,
}

impl Card {
    pub fn new(name: impl Into<String>, korean: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            korean: korean.into(),
        }
    }
}

/// Deduplication key: `(primary, situation, card_name)`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TopicKey {
    pub primary: String,
    pub situation: String,
    pub card_name: String,
}

impl TopicKey {
    pub fn new(
        primary: impl Into<String>,
        situation: impl Into<String>,
        card_name: impl Into<String>,
    ) -> Self {
        Self {
            primary: primary.into(),
            situation: situation.into(),
            card_name: card_name.into(),
        }
    }
}

impl fmt::Display for TopicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} / {} / {}", self.primary, self.situation, self.card_name)
    }
}

/// One drawn topic
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Topic {
    /// Personality type (e.g. `INTJ`)
    pub primary: String,

    /// Relationship situation
    pub situation: String,

    /// Deck the card was drawn from
    pub card_kind: CardKind,

    /// The drawn card
    pub card: Card,
}

impl Topic {
    /// Deduplication key for this topic
    pub fn key(&self) -> TopicKey {
        TopicKey::new(&self.primary, &self.situation, &self.card.name)
    }

    /// Situation without the parenthesized English gloss
    pub fn situation_keyword(&self) -> &str {
        self.situation
            .split('(')
            .next()
            .unwrap_or(&self.situation)
            .trim()
    }

    /// Default alt text for the featured image
    pub fn default_alt_text(&self) -> String {
        format!("{} {} {}", self.primary, self.situation, self.card.korean)
    }

    /// File name for the featured image upload
    pub fn image_filename(&self) -> String {
        crate::utils::sanitize_filename(&format!("{}_{}.jpg", self.primary, self.card.name))
    }
}

// ============================================================================
// Topic Space
// ============================================================================

/// The combinatorial topic universe
#[derive(Debug, Clone)]
pub struct TopicSpace {
    primaries: Vec<String>,
    situations: Vec<String>,
    decks: Vec<(CardKind, Vec<Card>)>,
}

impl TopicSpace {
    /// Build a space, rejecting empty dimensions and card names shared by two decks
    pub fn new(
        primaries: Vec<String>,
        situations: Vec<String>,
        decks: Vec<(CardKind, Vec<Card>)>,
    ) -> Result<Self, TopicError> {
        if primaries.is_empty() {
            return Err(TopicError::EmptyDimension("primary"));
        }
        if situations.is_empty() {
            return Err(TopicError::EmptyDimension("situation"));
        }
        if decks.is_empty() || decks.iter().any(|(_, cards)| cards.is_empty()) {
            return Err(TopicError::EmptyDimension("card"));
        }

        let mut seen: HashMap<&str, CardKind> = HashMap::new();
        for (kind, cards) in &decks {
            for card in cards {
                if let Some(first) = seen.insert(card.name.as_str(), *kind) {
                    return Err(TopicError::AmbiguousCard {
                        name: card.name.clone(),
                        first,
                        second: *kind,
                    });
                }
            }
        }

        Ok(Self {
            primaries,
            situations,
            decks,
        })
    }

    /// The built-in MBTI × situation × (tarot | numerology | oracle) space
    pub fn default_space() -> Self {
        fn deck(cards: &[(&str, &str)]) -> Vec<Card> {
            cards.iter().map(|(name, ko)| Card::new(*name, *ko)).collect()
        }

        Self {
            primaries: data::MBTI_TYPES.iter().map(|s| s.to_string()).collect(),
            situations: data::LOVE_SITUATIONS.iter().map(|s| s.to_string()).collect(),
            decks: vec![
                (CardKind::Tarot, deck(data::TAROT_MAJOR_ARCANA)),
                (CardKind::Numerology, deck(data::NUMEROLOGY_NUMBERS)),
                (CardKind::Oracle, deck(data::ORACLE_CARDS)),
            ],
        }
    }

    pub fn primaries(&self) -> &[String] {
        &self.primaries
    }

    pub fn situations(&self) -> &[String] {
        &self.situations
    }

    pub fn decks(&self) -> &[(CardKind, Vec<Card>)] {
        &self.decks
    }

    /// Number of distinct card names across all decks
    pub fn card_count(&self) -> usize {
        self.decks.iter().map(|(_, cards)| cards.len()).sum()
    }

    /// Number of distinct deduplication keys
    pub fn total_combinations(&self) -> usize {
        self.primaries.len() * self.situations.len() * self.card_count()
    }

    /// Enumerate every topic in the space
    pub fn iter_topics(&self) -> impl Iterator<Item = Topic> + '_ {
        self.primaries.iter().flat_map(move |primary| {
            self.situations.iter().flat_map(move |situation| {
                self.decks.iter().flat_map(move |(kind, cards)| {
                    cards.iter().map(move |card| Topic {
                        primary: primary.clone(),
                        situation: situation.clone(),
                        card_kind: *kind,
                        card: card.clone(),
                    })
                })
            })
        })
    }
}

impl Default for TopicSpace {
    fn default() -> Self {
        Self::default_space()
    }
}
