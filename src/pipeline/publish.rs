//! Publishing with retry and draft fallback

use crate::cms::{Cms, PostRequest, PostStatus, PublishedPost, TermKind};
use crate::metrics;
use crate::utils::error::CmsError;
use crate::utils::retry::{with_retry_if, RetryPolicy};

/// Result of [`publish_with_fallback`]
#[derive(Debug)]
pub struct PublishAttempt {
    pub result: Result<PublishedPost, CmsError>,
    /// True when the post was retried as a draft
    pub fallback_used: bool,
}

/// Create the post, retrying transient errors, then retry once more as a draft
///
/// The draft fallback only applies to non-draft requests and drops any
/// schedule time. When the draft also fails its error is returned.
pub async fn publish_with_fallback(
    cms: &dyn Cms,
    request: &PostRequest,
    retry: &RetryPolicy,
) -> PublishAttempt {
    let first = with_retry_if(retry, || cms.create_post(request), CmsError::is_recoverable).await;

    let error = match first {
        Ok(post) => {
            return PublishAttempt {
                result: Ok(post),
                fallback_used: false,
            }
        }
        Err(e) if !request.status.is_public() => {
            tracing::error!(error = %e, "Draft publish failed");
            return PublishAttempt {
                result: Err(e),
                fallback_used: false,
            };
        }
        Err(e) => e,
    };

    tracing::warn!(
        status = %request.status,
        error = %error,
        "Publish failed, retrying as draft"
    );
    metrics::record_fallback();

    let draft = PostRequest {
        status: PostStatus::Draft,
        scheduled_at: None,
        ..request.clone()
    };
    let result = with_retry_if(retry, || cms.create_post(&draft), CmsError::is_recoverable).await;

    if let Err(e) = &result {
        tracing::error!(original = %error, error = %e, "Draft fallback failed");
    }

    PublishAttempt {
        result,
        fallback_used: true,
    }
}

/// Resolve each term independently; failures are logged and skipped
pub async fn resolve_terms(cms: &dyn Cms, kind: TermKind, names: &[String]) -> Vec<u64> {
    let mut ids = Vec::with_capacity(names.len());

    for name in names {
        match cms.find_or_create_term(kind, name).await {
            Ok(id) => ids.push(id),
            Err(e) => tracing::warn!(%kind, name = %name, error = %e, "Failed to resolve term"),
        }
    }

    ids
}
