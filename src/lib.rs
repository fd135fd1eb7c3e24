//! dalbit - MBTI x tarot relationship blog publisher
//!
//! Draws never-before-used `(personality type, situation, card)` topics,
//! generates a post for each with an LLM, checks it against a content policy
//! and publishes it to WordPress, recording every attempt in a durable ledger.
//!
//! # Architecture
//!
//! - [`topic`] - Topic space and duplicate-free allocation
//! - [`ledger`] - Durable record of used topics (SQLite, in-memory)
//! - [`validator`] - Content policy checks and sanitization
//! - [`oracle`] - Text and image generation clients
//! - [`cms`] - CMS abstraction and the WordPress REST client
//! - [`schedule`] - Publish windows and weekly periods
//! - [`pipeline`] - One-shot and weekly publish coordinators
//! - [`config`] - Configuration loading and validation
//! - [`metrics`] - Prometheus counters for pipeline outcomes
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use dalbit::prelude::*;
//! use rand::SeedableRng;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::from_env()?;
//!     config.validate()?;
//!
//!     let ledger = dalbit::ledger::open_sqlite_ledger(&config.database.sqlite_path)?;
//!     let rng = rand_chacha::ChaCha8Rng::from_entropy();
//!     let allocator = TopicAllocator::new(TopicSpace::default(), rng);
//!     let oracle = Arc::new(AnthropicOracle::new(config.anthropic_config())?);
//!     let cms = Arc::new(WordPressClient::new(config.wordpress_config())?);
//!
//!     let mut coordinator = Coordinator::new(allocator, ledger, oracle, cms);
//!     let outcome = coordinator.run().await?;
//!     println!("{}: {}", outcome.status, outcome.title);
//!     Ok(())
//! }
//! ```

// Initialize rust-i18n at crate root level
rust_i18n::i18n!("locales", fallback = "en");

pub mod cms;
pub mod config;
pub mod error;
pub mod i18n;
pub mod ledger;
pub mod metrics;
pub mod oracle;
pub mod pipeline;
pub mod schedule;
pub mod topic;
pub mod utils;
pub mod validator;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::cms::{Cms, PostStatus, WordPressClient};
    pub use crate::config::Config;
    pub use crate::error::{DalbitErrorTrait, Error, ErrorCategory, Result};
    pub use crate::ledger::{SharedTopicLedger, TopicLedger};
    pub use crate::oracle::{AnthropicOracle, ContentOracle};
    pub use crate::pipeline::{Coordinator, PipelineOptions, PipelineOutcome, WeeklyCoordinator};
    pub use crate::topic::{Topic, TopicAllocator, TopicKey, TopicSpace};
    pub use crate::validator::ContentValidator;
}

// Direct re-exports for convenience
pub use topic::{Topic, TopicKey};
