//! Common test utilities: scripted CMS and generation backends

#![allow(dead_code)]

use async_trait::async_trait;
use bytes::Bytes;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use dalbit::cms::{Cms, PostRequest, PostStatus, PublishedPost, TermKind};
use dalbit::oracle::{ContentDraft, ContentOracle, ImageOracle, PeriodicOracle, SeoMetadata};
use dalbit::schedule::WeekPeriod;
use dalbit::topic::Topic;
use dalbit::utils::error::{CmsError, OracleError};

const SECTION: &str = "관계의 흐름을 천천히 살펴보며 스스로의 마음을 들여다보는 시간입니다. ";

/// Body that satisfies every content rule
pub fn valid_body() -> String {
    body_with("")
}

/// Valid body with `extra` appended to the first section
pub fn body_with(extra: &str) -> String {
    let section = SECTION.repeat(10);
    let disclaimer = "이 글은 참고 자료일 뿐이며, 실제 선택과 책임은 모두 본인에게 있습니다.";
    format!(
        "## 지금의 마음\n{section}{extra}\n\n## 카드가 비추는 것\n{section}\n\n\
         ## 오늘의 제안\n{section}\n\n{disclaimer}"
    )
}

/// Body without the disclaimer
pub fn body_without_disclaimer() -> String {
    let section = SECTION.repeat(10);
    format!("## 하나\n{section}\n\n## 둘\n{section}\n\n## 셋\n{section}")
}

pub fn draft(title: &str, body: String) -> ContentDraft {
    ContentDraft {
        title: title.to_string(),
        body,
        metadata: SeoMetadata {
            description: "MBTI와 타로로 읽는 연애 심리".to_string(),
            og_title: title.to_string(),
            og_description: "카드 한 장으로 살펴보는 관계".to_string(),
            image_alt: String::new(),
            internal_links: vec![],
        },
    }
}

// ============================================================================
// Oracles
// ============================================================================

/// Returns the same body for every topic; the title names the topic
pub struct ScriptedOracle {
    body: String,
    failures: Mutex<VecDeque<OracleError>>,
    calls: AtomicU32,
    bare: bool,
}

impl ScriptedOracle {
    pub fn new(body: String) -> Self {
        Self {
            body,
            failures: Mutex::new(VecDeque::new()),
            calls: AtomicU32::new(0),
            bare: false,
        }
    }

    /// Drafts come back without SEO metadata
    pub fn without_seo(mut self) -> Self {
        self.bare = true;
        self
    }

    /// Fail the next calls with these errors, in order
    pub fn fail_with(self, errors: Vec<OracleError>) -> Self {
        *self.failures.lock().unwrap() = errors.into();
        self
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    fn next(&self, title: String) -> Result<ContentDraft, OracleError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = self.failures.lock().unwrap().pop_front() {
            return Err(err);
        }
        let mut draft = draft(&title, self.body.clone());
        if self.bare {
            draft.metadata = SeoMetadata::default();
        }
        Ok(draft)
    }
}

#[async_trait]
impl ContentOracle for ScriptedOracle {
    async fn generate(&self, topic: &Topic) -> Result<ContentDraft, OracleError> {
        self.next(format!(
            "{} {} {}",
            topic.primary,
            topic.situation_keyword(),
            topic.card.korean
        ))
    }
}

#[async_trait]
impl PeriodicOracle for ScriptedOracle {
    async fn generate_weekly(
        &self,
        subject: &str,
        week: &WeekPeriod,
    ) -> Result<ContentDraft, OracleError> {
        self.next(format!("{subject} 주간 운세 ({})", week.label()))
    }
}

/// Fails generation for the listed subjects only
pub struct SelectiveWeeklyOracle {
    pub body: String,
    pub failing: Vec<String>,
}

#[async_trait]
impl PeriodicOracle for SelectiveWeeklyOracle {
    async fn generate_weekly(
        &self,
        subject: &str,
        week: &WeekPeriod,
    ) -> Result<ContentDraft, OracleError> {
        if self.failing.iter().any(|s| s == subject) {
            return Err(OracleError::Rejected {
                status: 400,
                body: "invalid request".to_string(),
            });
        }
        Ok(draft(
            &format!("{subject} 주간 운세 ({})", week.label()),
            self.body.clone(),
        ))
    }
}

pub struct StaticImageOracle {
    pub fail: bool,
}

#[async_trait]
impl ImageOracle for StaticImageOracle {
    async fn generate_image(&self, _topic: &Topic) -> Result<Bytes, OracleError> {
        if self.fail {
            Err(OracleError::Rejected {
                status: 400,
                body: "content policy".to_string(),
            })
        } else {
            Ok(Bytes::from_static(b"\xFF\xD8\xFF\xE0fake-jpeg"))
        }
    }
}

// ============================================================================
// CMS
// ============================================================================

#[derive(Debug, Default)]
struct CmsState {
    next_id: u64,
    terms: Vec<(TermKind, String, u64)>,
    posts: Vec<PostRequest>,
    create_calls: u32,
    media: Vec<(String, String)>,
    featured: Vec<(u64, u64)>,
    seo: Vec<(u64, SeoMetadata)>,
}

/// In-memory CMS that records every call
///
/// Statuses listed in `rejected` fail with a 503 on every attempt.
#[derive(Default)]
pub struct RecordingCms {
    state: Mutex<CmsState>,
    rejected: Vec<PostStatus>,
    reject_all: bool,
    fail_terms: bool,
}

impl RecordingCms {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every create request at this status fails with a server error
    pub fn rejecting(mut self, status: PostStatus) -> Self {
        self.rejected.push(status);
        self
    }

    /// Every create request fails with a server error
    pub fn rejecting_all(mut self) -> Self {
        self.reject_all = true;
        self
    }

    /// Term resolution fails for every name
    pub fn failing_terms(mut self) -> Self {
        self.fail_terms = true;
        self
    }

    pub fn posts(&self) -> Vec<PostRequest> {
        self.state.lock().unwrap().posts.clone()
    }

    pub fn create_calls(&self) -> u32 {
        self.state.lock().unwrap().create_calls
    }

    pub fn term_names(&self, kind: TermKind) -> Vec<String> {
        self.state
            .lock()
            .unwrap()
            .terms
            .iter()
            .filter(|(k, _, _)| *k == kind)
            .map(|(_, name, _)| name.clone())
            .collect()
    }

    pub fn media(&self) -> Vec<(String, String)> {
        self.state.lock().unwrap().media.clone()
    }

    pub fn featured(&self) -> Vec<(u64, u64)> {
        self.state.lock().unwrap().featured.clone()
    }

    pub fn seo_updates(&self) -> usize {
        self.state.lock().unwrap().seo.len()
    }
}

#[async_trait]
impl Cms for RecordingCms {
    async fn find_or_create_term(&self, kind: TermKind, name: &str) -> Result<u64, CmsError> {
        if self.fail_terms {
            return Err(CmsError::ServerError(500));
        }
        let mut state = self.state.lock().unwrap();
        if let Some((_, _, id)) = state.terms.iter().find(|(k, n, _)| *k == kind && n == name) {
            return Ok(*id);
        }
        state.next_id += 1;
        let id = state.next_id;
        state.terms.push((kind, name.to_string(), id));
        Ok(id)
    }

    async fn create_post(&self, post: &PostRequest) -> Result<PublishedPost, CmsError> {
        let mut state = self.state.lock().unwrap();
        state.create_calls += 1;
        if self.reject_all || self.rejected.contains(&post.status) {
            return Err(CmsError::ServerError(503));
        }

        state.next_id += 1;
        let id = 1000 + state.next_id;
        state.posts.push(post.clone());
        Ok(PublishedPost {
            id,
            url: format!("https://blog.example.com/?p={id}"),
            status: post.status,
        })
    }

    async fn upload_media(
        &self,
        _data: Bytes,
        filename: &str,
        alt_text: &str,
    ) -> Result<u64, CmsError> {
        let mut state = self.state.lock().unwrap();
        state.next_id += 1;
        state.media.push((filename.to_string(), alt_text.to_string()));
        Ok(5000 + state.next_id)
    }

    async fn set_featured_media(&self, post_id: u64, media_id: u64) -> Result<(), CmsError> {
        self.state.lock().unwrap().featured.push((post_id, media_id));
        Ok(())
    }

    async fn update_seo(&self, post_id: u64, seo: &SeoMetadata) -> Result<(), CmsError> {
        self.state.lock().unwrap().seo.push((post_id, seo.clone()));
        Ok(())
    }
}
