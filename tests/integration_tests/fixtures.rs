//! Test fixtures: small topic spaces, clocks and canned HTTP payloads

#![allow(dead_code)]

use chrono::{DateTime, TimeZone, Utc};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::sync::Arc;

use dalbit::pipeline::Clock;
use dalbit::topic::{Card, CardKind, TopicAllocator, TopicSpace};

/// Space with exactly one topic
pub fn single_space(primary: &str, situation: &str, card: (&str, &str)) -> TopicSpace {
    TopicSpace::new(
        vec![primary.to_string()],
        vec![situation.to_string()],
        vec![(CardKind::Tarot, vec![Card::new(card.0, card.1)])],
    )
    .unwrap()
}

/// One type, one situation, three cards across two decks
pub fn small_space() -> TopicSpace {
    TopicSpace::new(
        vec!["ENFP".to_string()],
        vec!["밀당 (push-pull dynamics)".to_string()],
        vec![
            (
                CardKind::Tarot,
                vec![Card::new("The Fool", "바보"), Card::new("The Star", "별")],
            ),
            (CardKind::Numerology, vec![Card::new("Number 7", "7번")]),
        ],
    )
    .unwrap()
}

pub fn allocator(space: TopicSpace, seed: u64) -> TopicAllocator<ChaCha8Rng> {
    TopicAllocator::new(space, ChaCha8Rng::seed_from_u64(seed))
}

/// Clock frozen at the given UTC time
pub fn fixed_clock(at: DateTime<Utc>) -> Clock {
    Arc::new(move || at)
}

/// 2025-03-12 12:00 KST, between the morning and afternoon windows
pub fn kst_noon() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 12, 3, 0, 0).unwrap()
}

/// 2025-03-12 10:00 KST, inside the 09-11 window
pub fn kst_morning() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 12, 1, 0, 0).unwrap()
}

/// Successful Anthropic Messages API response
pub fn anthropic_response(text: &str) -> serde_json::Value {
    serde_json::json!({
        "id": "msg_01",
        "type": "message",
        "role": "assistant",
        "content": [{ "type": "text", "text": text }],
        "usage": { "input_tokens": 812, "output_tokens": 2048 }
    })
}

/// Successful WordPress post creation response
pub fn wp_post_response(id: u64, status: &str) -> serde_json::Value {
    serde_json::json!({
        "id": id,
        "link": format!("https://blog.example.com/?p={id}"),
        "status": status
    })
}
