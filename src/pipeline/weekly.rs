//! Weekly per-subject fortune publishing
//!
//! Runs on Mondays and publishes one post per subject for the current
//! Monday-to-Sunday week. Subjects already recorded for the week are skipped,
//! so rerunning the same week is safe.

use chrono::NaiveDate;
use serde::Serialize;
use std::sync::Arc;

use super::publish::{publish_with_fallback, resolve_terms};
use super::{review_content, PipelineError};
use crate::cms::{Cms, PostRequest, PostStatus, TermKind};
use crate::ledger::{EntryStatus, PeriodRecord, SharedTopicLedger};
use crate::metrics;
use crate::oracle::PeriodicOracle;
use crate::schedule::{is_weekly_publish_day, WeekPeriod};
use crate::topic::data::MBTI_TYPES;
use crate::utils::error::OracleError;
use crate::utils::retry::{with_retry_if, RetryPolicy};
use crate::validator::ContentValidator;

/// Tag attached to every weekly post
pub const WEEKLY_TAG: &str = "주간운세";

/// Weekly run settings
#[derive(Debug, Clone)]
pub struct WeeklyOptions {
    pub subjects: Vec<String>,
    /// `Future` is treated as `Publish`; weekly posts are never scheduled
    pub preferred_status: PostStatus,
    pub auto_sanitize: bool,
    pub retry: RetryPolicy,
}

impl Default for WeeklyOptions {
    fn default() -> Self {
        Self {
            subjects: MBTI_TYPES.iter().map(|s| s.to_string()).collect(),
            preferred_status: PostStatus::Draft,
            auto_sanitize: true,
            retry: RetryPolicy::default(),
        }
    }
}

/// Result of one weekly run
#[derive(Debug, Clone, Serialize)]
pub struct WeeklySummary {
    pub week: WeekPeriod,
    pub published: usize,
    pub skipped: usize,
    pub failed: usize,
    pub errors: Vec<String>,
}

/// Publishes one post per subject per week
pub struct WeeklyCoordinator {
    ledger: SharedTopicLedger,
    oracle: Arc<dyn PeriodicOracle>,
    cms: Arc<dyn Cms>,
    validator: ContentValidator,
    options: WeeklyOptions,
}

impl WeeklyCoordinator {
    pub fn new(
        ledger: SharedTopicLedger,
        oracle: Arc<dyn PeriodicOracle>,
        cms: Arc<dyn Cms>,
    ) -> Self {
        Self {
            ledger,
            oracle,
            cms,
            validator: ContentValidator::default(),
            options: WeeklyOptions::default(),
        }
    }

    pub fn with_validator(mut self, validator: ContentValidator) -> Self {
        self.validator = validator;
        self
    }

    pub fn with_options(mut self, options: WeeklyOptions) -> Self {
        self.options = options;
        self
    }

    /// Publish every pending subject for the week containing `today`
    ///
    /// Returns `Ok(None)` without doing anything when `today` is not a Monday
    /// and `force` is false. A subject whose generation fails is counted as
    /// failed and the run moves on; a ledger write failure ends the run.
    #[tracing::instrument(skip(self), fields(week_start = %WeekPeriod::containing(today).start))]
    pub async fn run(
        &self,
        today: NaiveDate,
        force: bool,
    ) -> Result<Option<WeeklySummary>, PipelineError> {
        if !force && !is_weekly_publish_day(today) {
            tracing::info!(%today, "Not a weekly publish day, skipping");
            return Ok(None);
        }

        let week = WeekPeriod::containing(today);
        let mut summary = WeeklySummary {
            week,
            published: 0,
            skipped: 0,
            failed: 0,
            errors: Vec::new(),
        };

        for subject in &self.options.subjects {
            let already = self
                .ledger
                .contains_period(subject, week.start)
                .map_err(|source| persistence(subject, &week, source))?;
            if already {
                tracing::debug!(subject, "Weekly post already recorded");
                summary.skipped += 1;
                continue;
            }

            match self.publish_subject(subject, &week).await? {
                Ok(status) if status.is_success() => summary.published += 1,
                Ok(_) => summary.failed += 1,
                Err(e) => {
                    tracing::error!(subject, error = %e, "Weekly generation failed");
                    summary.errors.push(format!("{subject}: {e}"));
                    summary.failed += 1;
                }
            }
        }

        metrics::record_weekly(summary.published, summary.skipped, summary.failed);
        tracing::info!(
            week = %week.label(),
            published = summary.published,
            skipped = summary.skipped,
            failed = summary.failed,
            "Weekly run finished"
        );

        Ok(Some(summary))
    }

    /// Outer error ends the run; inner error is a generation failure for
    /// this subject only
    async fn publish_subject(
        &self,
        subject: &str,
        week: &WeekPeriod,
    ) -> Result<Result<EntryStatus, OracleError>, PipelineError> {
        let oracle = &self.oracle;
        let draft = match with_retry_if(
            &self.options.retry,
            || oracle.generate_weekly(subject, week),
            OracleError::is_recoverable,
        )
        .await
        {
            Ok(draft) => draft,
            Err(e) => return Ok(Err(e)),
        };

        let reviewed = review_content(&self.validator, draft, self.options.auto_sanitize);
        let status = match (reviewed.is_publishable(), self.options.preferred_status) {
            (false, _) => {
                metrics::record_downgrade();
                PostStatus::Draft
            }
            (true, PostStatus::Future) => PostStatus::Publish,
            (true, status) => status,
        };

        let categories =
            resolve_terms(self.cms.as_ref(), TermKind::Category, &[format!("MBTI {subject}")])
                .await;
        let tags = resolve_terms(
            self.cms.as_ref(),
            TermKind::Tag,
            &[WEEKLY_TAG.to_string(), subject.to_string()],
        )
        .await;

        let request = PostRequest {
            title: reviewed.draft.title.clone(),
            content: reviewed.draft.body.clone(),
            status,
            categories,
            tags,
            scheduled_at: None,
        };
        let attempt =
            publish_with_fallback(self.cms.as_ref(), &request, &self.options.retry).await;

        let mut record = PeriodRecord {
            subject: subject.to_string(),
            period_start: week.start,
            period_end: week.end,
            title: reviewed.draft.title,
            post_id: None,
            post_url: None,
            status: EntryStatus::Failed,
            error: None,
        };

        match attempt.result {
            Ok(post) => {
                let seo = &reviewed.draft.metadata;
                if seo.has_meta() {
                    if let Err(e) = self.cms.update_seo(post.id, seo).await {
                        tracing::warn!(post_id = post.id, error = %e, "Failed to update SEO meta");
                    }
                }
                record.status = EntryStatus::from(post.status);
                record.post_id = Some(post.id);
                record.post_url = Some(post.url);
            }
            Err(e) => record.error = Some(e.to_string()),
        }

        self.ledger
            .record_period(&record)
            .map_err(|source| persistence(subject, week, source))?;

        Ok(Ok(record.status))
    }
}

fn persistence(
    subject: &str,
    week: &WeekPeriod,
    source: crate::ledger::LedgerError,
) -> PipelineError {
    PipelineError::Persistence {
        key: format!("{subject} / {}", week.start),
        source,
    }
}
