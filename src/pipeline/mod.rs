//! Validate-and-publish pipeline
//!
//! One run takes one unused topic from allocation to a ledger entry:
//!
//! ```text
//! ALLOCATE -> GENERATE -> IMAGE -> VALIDATE -> (SANITIZE -> REVALIDATE)?
//!          -> CATEGORIZE -> SCHEDULE -> PUBLISH -> AFTER-PUBLISH -> RECORD
//! ```
//!
//! Allocation and generation failures abort before anything is recorded, so
//! the topic stays available. Once publication has been attempted exactly one
//! ledger entry is written, whatever the outcome, and a failure to write it is
//! returned to the caller.
//!
//! Content that fails validation is never sent at a public status.

pub mod publish;
pub mod weekly;

pub use publish::{publish_with_fallback, resolve_terms, PublishAttempt};
pub use weekly::{WeeklyCoordinator, WeeklyOptions, WeeklySummary};

use bytes::Bytes;
use chrono::{DateTime, Utc};
use rand::Rng;
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

use crate::cms::{Cms, PostRequest, PostStatus, PublishedPost, TermKind};
use crate::ledger::{EntryStatus, LedgerError, LedgerRecord, SharedTopicLedger};
use crate::metrics;
use crate::oracle::{ContentDraft, ContentOracle, ImageOracle, SeoMetadata};
use crate::schedule::{PublishTiming, PublishWindows};
use crate::topic::{Topic, TopicAllocator, TopicError, TopicKey};
use crate::utils::error::OracleError;
use crate::utils::retry::{with_retry_if, RetryPolicy};
use crate::validator::{ContentValidator, ValidationResult};

/// Categories every one-shot post is filed under, after `MBTI <type>`
pub const SHARED_CATEGORIES: &[&str] = &["타로 심리 해석", "연애 심리"];

// ============================================================================
// Errors
// ============================================================================

/// Failures that end a run
#[derive(Error, Debug)]
pub enum PipelineError {
    /// No topic could be allocated
    #[error("Topic allocation failed: {0}")]
    Topic(#[from] TopicError),

    /// Content generation failed after retries; nothing was recorded
    #[error("Content generation failed for {key}: {source}")]
    Generation {
        key: String,
        #[source]
        source: OracleError,
    },

    /// The ledger entry could not be written
    #[error("Failed to record {key} in the ledger: {source}")]
    Persistence {
        key: String,
        #[source]
        source: LedgerError,
    },
}

// ============================================================================
// Options and Outcome
// ============================================================================

/// Source of the current time
pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// Run-level settings
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    /// Status to publish at when validation passes
    pub preferred_status: PostStatus,

    /// Rewrite forbidden vocabulary before giving up on a draft
    pub auto_sanitize: bool,

    /// Publish windows and slot times, in the site's UTC offset
    pub windows: PublishWindows,

    /// Defer a `publish` outside the windows to the next slot
    pub defer_outside_windows: bool,

    /// Retry policy for every external call
    pub retry: RetryPolicy,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            preferred_status: PostStatus::Draft,
            auto_sanitize: true,
            windows: PublishWindows::default(),
            defer_outside_windows: false,
            retry: RetryPolicy::default(),
        }
    }
}

/// What a run did
#[derive(Debug, Clone, Serialize)]
pub struct PipelineOutcome {
    /// A post exists in the CMS
    pub success: bool,
    pub topic_key: TopicKey,
    pub title: String,
    pub post: Option<PublishedPost>,
    /// Status written to the ledger
    pub status: EntryStatus,
    pub fallback_used: bool,
    pub sanitized: bool,
    /// Issues left after validation (and sanitization)
    pub validation_issues: Vec<String>,
    pub error: Option<String>,
}

// ============================================================================
// Content Review
// ============================================================================

/// A draft after validation and optional sanitization
#[derive(Debug, Clone)]
pub struct ReviewedDraft {
    pub draft: ContentDraft,
    pub validation: ValidationResult,
    pub sanitized: bool,
}

impl ReviewedDraft {
    /// Whether the draft may go out at a public status
    pub fn is_publishable(&self) -> bool {
        self.validation.is_valid
    }
}

/// Validate, sanitize once if allowed, and revalidate
///
/// Sanitization touches the body only; a forbidden word in the title keeps
/// the draft invalid.
pub fn review_content(
    validator: &ContentValidator,
    mut draft: ContentDraft,
    auto_sanitize: bool,
) -> ReviewedDraft {
    let validation = validator.validate(&draft.title, &draft.body);
    if validation.is_valid {
        return ReviewedDraft {
            draft,
            validation,
            sanitized: false,
        };
    }

    tracing::warn!(issues = ?validation.issues, "Content validation failed");

    if !auto_sanitize {
        return ReviewedDraft {
            draft,
            validation,
            sanitized: false,
        };
    }

    draft.body = validator.sanitize(&draft.body);
    metrics::record_sanitize();

    let validation = validator.validate(&draft.title, &draft.body);
    if validation.is_valid {
        tracing::info!("Content passed validation after sanitization");
    } else {
        tracing::warn!(issues = ?validation.issues, "Content still invalid after sanitization");
    }

    ReviewedDraft {
        draft,
        validation,
        sanitized: true,
    }
}

/// Category names for a topic
pub fn topic_categories(topic: &Topic) -> Vec<String> {
    std::iter::once(format!("MBTI {}", topic.primary))
        .chain(SHARED_CATEGORIES.iter().map(|c| c.to_string()))
        .collect()
}

/// Tag names for a topic
pub fn topic_tags(topic: &Topic) -> Vec<String> {
    vec![
        topic.primary.clone(),
        topic.card.name.clone(),
        topic.card.korean.clone(),
        topic.situation_keyword().to_string(),
    ]
}

// ============================================================================
// Coordinator
// ============================================================================

/// Drives one topic from allocation to the ledger
pub struct Coordinator<R> {
    allocator: TopicAllocator<R>,
    ledger: SharedTopicLedger,
    content: Arc<dyn ContentOracle>,
    image: Option<Arc<dyn ImageOracle>>,
    cms: Arc<dyn Cms>,
    validator: ContentValidator,
    options: PipelineOptions,
    clock: Clock,
}

impl<R: Rng> Coordinator<R> {
    pub fn new(
        allocator: TopicAllocator<R>,
        ledger: SharedTopicLedger,
        content: Arc<dyn ContentOracle>,
        cms: Arc<dyn Cms>,
    ) -> Self {
        Self {
            allocator,
            ledger,
            content,
            image: None,
            cms,
            validator: ContentValidator::default(),
            options: PipelineOptions::default(),
            clock: Arc::new(Utc::now),
        }
    }

    /// Generate and attach featured images
    pub fn with_image_oracle(mut self, image: Arc<dyn ImageOracle>) -> Self {
        self.image = Some(image);
        self
    }

    pub fn with_validator(mut self, validator: ContentValidator) -> Self {
        self.validator = validator;
        self
    }

    pub fn with_options(mut self, options: PipelineOptions) -> Self {
        self.options = options;
        self
    }

    /// Replace the time source
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    pub fn allocator(&self) -> &TopicAllocator<R> {
        &self.allocator
    }

    pub fn options(&self) -> &PipelineOptions {
        &self.options
    }

    /// Execute one run
    ///
    /// # Errors
    ///
    /// - [`PipelineError::Topic`] when allocation fails
    /// - [`PipelineError::Generation`] when content generation exhausts retries
    /// - [`PipelineError::Persistence`] when the ledger entry cannot be written
    ///
    /// Publish failures are not errors; they are reported in the outcome.
    #[tracing::instrument(skip(self), fields(run_id = %Uuid::new_v4()))]
    pub async fn run(&mut self) -> Result<PipelineOutcome, PipelineError> {
        // ALLOCATE
        let topic = self.allocator.allocate(self.ledger.as_ref()).map_err(|e| {
            tracing::error!(error = %e, "Topic allocation failed");
            metrics::record_run("aborted");
            e
        })?;
        let key = topic.key();

        // GENERATE
        let content = &self.content;
        let draft = with_retry_if(
            &self.options.retry,
            || content.generate(&topic),
            OracleError::is_recoverable,
        )
        .await
        .map_err(|source| {
            tracing::error!(key = %key, error = %source, "Content generation failed");
            metrics::record_run("aborted");
            PipelineError::Generation {
                key: key.to_string(),
                source,
            }
        })?;

        // IMAGE
        let image = self.generate_image(&topic).await;

        // VALIDATE / SANITIZE / REVALIDATE
        let reviewed = review_content(&self.validator, draft, self.options.auto_sanitize);
        if !reviewed.is_publishable() {
            metrics::record_downgrade();
        }

        // CATEGORIZE
        let categories =
            resolve_terms(self.cms.as_ref(), TermKind::Category, &topic_categories(&topic)).await;
        let tags = resolve_terms(self.cms.as_ref(), TermKind::Tag, &topic_tags(&topic)).await;

        // SCHEDULE
        let (status, scheduled_at) = self.resolve_status(reviewed.is_publishable());
        tracing::info!(status = %status, scheduled_at = ?scheduled_at, "Publishing");

        // PUBLISH
        let request = PostRequest {
            title: reviewed.draft.title.clone(),
            content: reviewed.draft.body.clone(),
            status,
            categories,
            tags,
            scheduled_at,
        };
        let attempt =
            publish_with_fallback(self.cms.as_ref(), &request, &self.options.retry).await;

        // AFTER-PUBLISH
        if let Ok(post) = &attempt.result {
            self.after_publish(&topic, post, &reviewed.draft.metadata, image)
                .await;
        }

        // RECORD
        let (record, outcome) = self.finish(&topic, reviewed, attempt);
        self.ledger.record(&record).map_err(|source| {
            tracing::error!(key = %key, error = %source, "Failed to record ledger entry");
            PipelineError::Persistence {
                key: key.to_string(),
                source,
            }
        })?;

        metrics::record_run(outcome.status.as_str());
        tracing::info!(
            key = %key,
            status = %outcome.status,
            success = outcome.success,
            fallback_used = outcome.fallback_used,
            "Pipeline run finished"
        );

        Ok(outcome)
    }

    async fn generate_image(&self, topic: &Topic) -> Option<Bytes> {
        let image = self.image.as_ref()?;
        match with_retry_if(
            &self.options.retry,
            || image.generate_image(topic),
            OracleError::is_recoverable,
        )
        .await
        {
            Ok(bytes) => Some(bytes),
            Err(e) => {
                tracing::warn!(error = %e, "Image generation failed, publishing without image");
                None
            }
        }
    }

    fn resolve_status(
        &mut self,
        publishable: bool,
    ) -> (PostStatus, Option<DateTime<chrono::FixedOffset>>) {
        if !publishable {
            return (PostStatus::Draft, None);
        }

        let now = (self.clock)();
        match self.options.preferred_status {
            PostStatus::Draft => (PostStatus::Draft, None),
            PostStatus::Publish if !self.options.defer_outside_windows => {
                (PostStatus::Publish, None)
            }
            PostStatus::Publish => {
                match self.options.windows.decide(&now, self.allocator.rng_mut()) {
                    PublishTiming::Immediate => (PostStatus::Publish, None),
                    PublishTiming::Scheduled(at) => (PostStatus::Future, Some(at)),
                }
            }
            PostStatus::Future => {
                let at = self.options.windows.next_slot(&now, self.allocator.rng_mut());
                (PostStatus::Future, Some(at))
            }
        }
    }

    async fn after_publish(
        &self,
        topic: &Topic,
        post: &PublishedPost,
        seo: &SeoMetadata,
        image: Option<Bytes>,
    ) {
        if let Some(bytes) = image {
            let alt = if seo.image_alt.is_empty() {
                topic.default_alt_text()
            } else {
                seo.image_alt.clone()
            };

            match self
                .cms
                .upload_media(bytes, &topic.image_filename(), &alt)
                .await
            {
                Ok(media_id) => {
                    if let Err(e) = self.cms.set_featured_media(post.id, media_id).await {
                        tracing::warn!(
                            post_id = post.id,
                            error = %e,
                            "Failed to set featured image"
                        );
                    }
                }
                Err(e) => tracing::warn!(post_id = post.id, error = %e, "Image upload failed"),
            }
        }

        if seo.has_meta() {
            if let Err(e) = self.cms.update_seo(post.id, seo).await {
                tracing::warn!(post_id = post.id, error = %e, "Failed to update SEO meta");
            }
        }
    }

    fn finish(
        &self,
        topic: &Topic,
        reviewed: ReviewedDraft,
        attempt: PublishAttempt,
    ) -> (LedgerRecord, PipelineOutcome) {
        let title = reviewed.draft.title;
        let key = topic.key();

        match attempt.result {
            Ok(post) => {
                let status = EntryStatus::from(post.status);
                let record = LedgerRecord::new(key.clone(), title.clone(), status)
                    .with_post(post.id, &post.url);
                let outcome = PipelineOutcome {
                    success: true,
                    topic_key: key,
                    title,
                    post: Some(post),
                    status,
                    fallback_used: attempt.fallback_used,
                    sanitized: reviewed.sanitized,
                    validation_issues: reviewed.validation.issues,
                    error: None,
                };
                (record, outcome)
            }
            Err(e) => {
                let error = e.to_string();
                let record = LedgerRecord::new(key.clone(), title.clone(), EntryStatus::Failed)
                    .with_error(&error);
                let outcome = PipelineOutcome {
                    success: false,
                    topic_key: key,
                    title,
                    post: None,
                    status: EntryStatus::Failed,
                    fallback_used: attempt.fallback_used,
                    sanitized: reviewed.sanitized,
                    validation_issues: reviewed.validation.issues,
                    error: Some(error),
                };
                (record, outcome)
            }
        }
    }
}
