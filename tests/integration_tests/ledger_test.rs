//! Ledger durability with the SQLite backend

use std::sync::Arc;
use tempfile::TempDir;

use dalbit::cms::PostStatus;
use dalbit::ledger::{open_sqlite_ledger, EntryStatus, TopicLedger};
use dalbit::pipeline::{Coordinator, PipelineOptions};
use dalbit::topic::TopicError;
use dalbit::utils::retry::RetryPolicy;

use crate::common::{valid_body, RecordingCms, ScriptedOracle};

use super::fixtures::{allocator, small_space};

fn draft_options() -> PipelineOptions {
    PipelineOptions {
        preferred_status: PostStatus::Draft,
        retry: RetryPolicy::immediate(1),
        ..PipelineOptions::default()
    }
}

#[tokio::test]
async fn test_used_topics_survive_restart() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("nested").join("dalbit.db");

    // First process: use two of the three topics
    let first_keys = {
        let ledger = open_sqlite_ledger(&db_path).unwrap();
        let mut coordinator = Coordinator::new(
            allocator(small_space(), 21).with_max_attempts(200),
            ledger,
            Arc::new(ScriptedOracle::new(valid_body())),
            Arc::new(RecordingCms::new()),
        )
        .with_options(draft_options());

        let a = coordinator.run().await.unwrap().topic_key;
        let b = coordinator.run().await.unwrap().topic_key;
        vec![a, b]
    };

    // Second process with the same seed must still pick the remaining topic
    let ledger = open_sqlite_ledger(&db_path).unwrap();
    for key in &first_keys {
        assert!(ledger.contains(key).unwrap());
    }

    let mut coordinator = Coordinator::new(
        allocator(small_space(), 21).with_max_attempts(200),
        ledger.clone(),
        Arc::new(ScriptedOracle::new(valid_body())),
        Arc::new(RecordingCms::new()),
    )
    .with_options(draft_options());

    let third = coordinator.run().await.unwrap().topic_key;
    assert!(!first_keys.contains(&third));

    let stats = ledger.stats().unwrap();
    assert_eq!(stats.total, 3);
    assert_eq!(stats.count(EntryStatus::Draft), 3);
    assert_eq!(stats.success_rate, 100.0);

    let pool = allocator(small_space(), 0).pool_status(ledger.as_ref()).unwrap();
    assert_eq!(pool.remaining, 0);
    assert_eq!(pool.utilization_percent, 100.0);

    assert!(matches!(
        allocator(small_space(), 0)
            .with_max_attempts(20)
            .allocate(ledger.as_ref()),
        Err(TopicError::Exhausted { attempts: 20 })
    ));
}

#[tokio::test]
async fn test_recent_entries_newest_first() {
    let temp_dir = TempDir::new().unwrap();
    let ledger = open_sqlite_ledger(temp_dir.path().join("dalbit.db")).unwrap();
    let mut coordinator = Coordinator::new(
        allocator(small_space(), 5).with_max_attempts(200),
        ledger.clone(),
        Arc::new(ScriptedOracle::new(valid_body())),
        Arc::new(RecordingCms::new()),
    )
    .with_options(draft_options());

    let mut keys = Vec::new();
    for _ in 0..3 {
        keys.push(coordinator.run().await.unwrap().topic_key);
    }

    let recent = ledger.recent(2).unwrap();
    assert_eq!(recent.len(), 2);
    assert_eq!(recent[0].record.key, keys[2]);
    assert_eq!(recent[1].record.key, keys[1]);
    assert!(recent[0].record.post_url.is_some());
}
