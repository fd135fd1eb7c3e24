//! Text and image generation services
//!
//! The pipeline only sees the traits. Concrete clients call the Anthropic
//! Messages API for text and the OpenAI Images API for featured images.
//!
//! # Modules
//!
//! - [`parse`] - Split a raw model response into metadata, title and body
//! - [`prompt`] - Handlebars prompt templates
//! - [`anthropic`] - Content and weekly generation via Anthropic
//! - [`image`] - Featured image generation via OpenAI

pub mod anthropic;
pub mod image;
pub mod parse;
pub mod prompt;

pub use anthropic::{AnthropicConfig, AnthropicOracle};
pub use image::{OpenAiImageConfig, OpenAiImageOracle};
pub use prompt::PromptRenderer;

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::schedule::WeekPeriod;
use crate::topic::Topic;
use crate::utils::error::OracleError;

/// SEO fields reported alongside a generated post; empty when absent
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeoMetadata {
    pub description: String,
    pub og_title: String,
    pub og_description: String,
    pub image_alt: String,
    pub internal_links: Vec<String>,
}

impl SeoMetadata {
    /// Any field the CMS meta update writes is set
    pub fn has_meta(&self) -> bool {
        !(self.description.is_empty()
            && self.og_title.is_empty()
            && self.og_description.is_empty())
    }
}

/// A generated post before validation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentDraft {
    pub title: String,
    /// Markdown body
    pub body: String,
    pub metadata: SeoMetadata,
}

/// Generates a post for a topic
#[async_trait]
pub trait ContentOracle: Send + Sync {
    async fn generate(&self, topic: &Topic) -> Result<ContentDraft, OracleError>;
}

/// Generates a weekly post for one subject
#[async_trait]
pub trait PeriodicOracle: Send + Sync {
    async fn generate_weekly(
        &self,
        subject: &str,
        week: &WeekPeriod,
    ) -> Result<ContentDraft, OracleError>;
}

/// Generates the featured image for a topic
#[async_trait]
pub trait ImageOracle: Send + Sync {
    async fn generate_image(&self, topic: &Topic) -> Result<Bytes, OracleError>;
}
