//! Weekly per-type publishing

use chrono::NaiveDate;
use std::sync::Arc;

use dalbit::cms::{PostStatus, TermKind};
use dalbit::ledger::{EntryStatus, MemoryTopicLedger};
use dalbit::pipeline::{PipelineError, WeeklyCoordinator, WeeklyOptions};
use dalbit::utils::retry::RetryPolicy;

use crate::common::{
    body_without_disclaimer, valid_body, RecordingCms, ScriptedOracle, SelectiveWeeklyOracle,
};

fn monday() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 3, 10).unwrap()
}

fn options(subjects: &[&str], status: PostStatus) -> WeeklyOptions {
    WeeklyOptions {
        subjects: subjects.iter().map(|s| s.to_string()).collect(),
        preferred_status: status,
        auto_sanitize: true,
        retry: RetryPolicy::immediate(2),
    }
}

#[tokio::test]
async fn test_weekly_publishes_every_subject_once() {
    let ledger = Arc::new(MemoryTopicLedger::new());
    let cms = Arc::new(RecordingCms::new());
    let coordinator = WeeklyCoordinator::new(
        ledger.clone(),
        Arc::new(ScriptedOracle::new(valid_body())),
        cms.clone(),
    )
    .with_options(options(&["INTJ", "ENFP", "ISTP"], PostStatus::Publish));

    let summary = coordinator.run(monday(), false).await.unwrap().unwrap();

    assert_eq!(summary.published, 3);
    assert_eq!(summary.skipped, 0);
    assert_eq!(summary.failed, 0);
    assert_eq!(summary.week.start, monday());
    assert_eq!(summary.week.end, NaiveDate::from_ymd_opt(2025, 3, 16).unwrap());

    let posts = cms.posts();
    assert_eq!(posts.len(), 3);
    assert!(posts.iter().all(|p| p.status == PostStatus::Publish));
    assert!(posts[0].title.starts_with("INTJ 주간 운세"));

    let tags = cms.term_names(TermKind::Tag);
    assert!(tags.contains(&"주간운세".to_string()));
    assert!(tags.contains(&"ENFP".to_string()));

    let periods = ledger.periods().unwrap();
    assert_eq!(periods.len(), 3);
    assert!(periods.iter().all(|p| p.status == EntryStatus::Published));

    // Same week again: everything is skipped
    let rerun = coordinator.run(monday(), false).await.unwrap().unwrap();
    assert_eq!(rerun.published, 0);
    assert_eq!(rerun.skipped, 3);
    assert_eq!(cms.posts().len(), 3);
}

#[tokio::test]
async fn test_weekly_skips_non_monday_unless_forced() {
    let cms = Arc::new(RecordingCms::new());
    let coordinator = WeeklyCoordinator::new(
        Arc::new(MemoryTopicLedger::new()),
        Arc::new(ScriptedOracle::new(valid_body())),
        cms.clone(),
    )
    .with_options(options(&["INFJ"], PostStatus::Draft));

    let wednesday = NaiveDate::from_ymd_opt(2025, 3, 12).unwrap();
    assert!(coordinator.run(wednesday, false).await.unwrap().is_none());
    assert!(cms.posts().is_empty());

    let summary = coordinator.run(wednesday, true).await.unwrap().unwrap();
    assert_eq!(summary.published, 1);
    assert_eq!(summary.week.start, monday());
}

#[tokio::test]
async fn test_weekly_continues_after_generation_failure() {
    let ledger = Arc::new(MemoryTopicLedger::new());
    let coordinator = WeeklyCoordinator::new(
        ledger.clone(),
        Arc::new(SelectiveWeeklyOracle {
            body: valid_body(),
            failing: vec!["ENTJ".to_string()],
        }),
        Arc::new(RecordingCms::new()),
    )
    .with_options(options(&["INTJ", "ENTJ", "ESFP"], PostStatus::Draft));

    let summary = coordinator.run(monday(), false).await.unwrap().unwrap();

    assert_eq!(summary.published, 2);
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.errors.len(), 1);
    assert!(summary.errors[0].starts_with("ENTJ:"));

    // Nothing recorded for the failed subject, so the next run retries it
    let subjects: Vec<_> = ledger
        .periods()
        .unwrap()
        .into_iter()
        .map(|p| p.subject)
        .collect();
    assert_eq!(subjects, vec!["INTJ", "ESFP"]);
}

#[tokio::test]
async fn test_weekly_invalid_content_saved_as_draft() {
    let cms = Arc::new(RecordingCms::new());
    let coordinator = WeeklyCoordinator::new(
        Arc::new(MemoryTopicLedger::new()),
        Arc::new(ScriptedOracle::new(body_without_disclaimer())),
        cms.clone(),
    )
    .with_options(options(&["ISFP"], PostStatus::Future));

    let summary = coordinator.run(monday(), false).await.unwrap().unwrap();

    assert_eq!(summary.published, 1);
    let post = &cms.posts()[0];
    assert_eq!(post.status, PostStatus::Draft);
    assert!(post.scheduled_at.is_none());
}

#[tokio::test]
async fn test_weekly_ledger_failure_aborts() {
    let ledger = Arc::new(MemoryTopicLedger::new());
    ledger.set_fail_writes(true);
    let coordinator = WeeklyCoordinator::new(
        ledger,
        Arc::new(ScriptedOracle::new(valid_body())),
        Arc::new(RecordingCms::new()),
    )
    .with_options(options(&["ESTJ", "ESFJ"], PostStatus::Draft));

    let err = coordinator.run(monday(), false).await.unwrap_err();
    assert!(matches!(err, PipelineError::Persistence { .. }));
}

#[tokio::test]
async fn test_weekly_seo_update_only_with_metadata() {
    let cms = Arc::new(RecordingCms::new());
    WeeklyCoordinator::new(
        Arc::new(MemoryTopicLedger::new()),
        Arc::new(ScriptedOracle::new(valid_body())),
        cms.clone(),
    )
    .with_options(options(&["INTP", "ENTP"], PostStatus::Publish))
    .run(monday(), false)
    .await
    .unwrap();
    assert_eq!(cms.seo_updates(), 2);

    let bare_cms = Arc::new(RecordingCms::new());
    WeeklyCoordinator::new(
        Arc::new(MemoryTopicLedger::new()),
        Arc::new(ScriptedOracle::new(valid_body()).without_seo()),
        bare_cms.clone(),
    )
    .with_options(options(&["INTP", "ENTP"], PostStatus::Publish))
    .run(monday(), false)
    .await
    .unwrap();
    assert_eq!(bare_cms.posts().len(), 2);
    assert_eq!(bare_cms.seo_updates(), 0);
}
