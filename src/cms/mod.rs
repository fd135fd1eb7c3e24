//! Content management system interface
//!
//! The pipeline talks to the CMS only through [`Cms`]. [`WordPressClient`]
//! implements it over the WordPress REST API; tests use in-process doubles.
//!
//! # Modules
//!
//! - [`wordpress`] - WordPress REST v2 client
//! - [`html`] - Markdown to HTML rendering for post bodies

pub mod html;
pub mod wordpress;

pub use wordpress::{WordPressClient, WordPressConfig};

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::oracle::SeoMetadata;
use crate::utils::error::CmsError;

/// Post status as understood by the CMS
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PostStatus {
    Draft,
    Publish,
    Future,
}

impl PostStatus {
    /// WordPress status string
    pub fn as_wp_str(&self) -> &'static str {
        match self {
            PostStatus::Draft => "draft",
            PostStatus::Publish => "publish",
            PostStatus::Future => "future",
        }
    }

    /// Parse a status reported by WordPress; unknown values map to `Draft`
    pub fn from_wp(s: &str) -> Self {
        s.parse().unwrap_or(PostStatus::Draft)
    }

    /// Publicly visible now or later
    pub fn is_public(&self) -> bool {
        !matches!(self, PostStatus::Draft)
    }
}

impl std::str::FromStr for PostStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "draft" => Ok(PostStatus::Draft),
            "publish" | "published" => Ok(PostStatus::Publish),
            "future" | "scheduled" => Ok(PostStatus::Future),
            _ => Err(format!("Unknown post status: {s}")),
        }
    }
}

impl fmt::Display for PostStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_wp_str())
    }
}

/// Taxonomy a term belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TermKind {
    Category,
    Tag,
}

impl TermKind {
    /// REST collection name
    pub fn endpoint(&self) -> &'static str {
        match self {
            TermKind::Category => "categories",
            TermKind::Tag => "tags",
        }
    }
}

impl fmt::Display for TermKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TermKind::Category => "category",
            TermKind::Tag => "tag",
        })
    }
}

/// A post to create
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PostRequest {
    pub title: String,
    /// Markdown body; clients render it for their platform
    pub content: String,
    pub status: PostStatus,
    pub categories: Vec<u64>,
    pub tags: Vec<u64>,
    /// Publication time, required for `Future`
    pub scheduled_at: Option<DateTime<FixedOffset>>,
}

/// A post the CMS accepted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishedPost {
    pub id: u64,
    pub url: String,
    pub status: PostStatus,
}

/// Operations the pipeline needs from a CMS
#[async_trait]
pub trait Cms: Send + Sync {
    /// Return the id of the named term, creating it when missing
    async fn find_or_create_term(&self, kind: TermKind, name: &str) -> Result<u64, CmsError>;

    /// Create a post
    async fn create_post(&self, post: &PostRequest) -> Result<PublishedPost, CmsError>;

    /// Upload an image and return its media id
    async fn upload_media(&self, data: Bytes, filename: &str, alt_text: &str)
        -> Result<u64, CmsError>;

    /// Attach uploaded media as the featured image
    async fn set_featured_media(&self, post_id: u64, media_id: u64) -> Result<(), CmsError>;

    /// Store excerpt and SEO meta fields on the post
    async fn update_seo(&self, post_id: u64, seo: &SeoMetadata) -> Result<(), CmsError>;
}
