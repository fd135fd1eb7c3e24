//! HTTP clients against a mock server

use chrono::{FixedOffset, TimeZone};
use std::time::Duration;
use wiremock::matchers::{body_partial_json, header, header_exists, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use dalbit::cms::{Cms, PostRequest, PostStatus, TermKind, WordPressClient, WordPressConfig};
use dalbit::oracle::{AnthropicConfig, AnthropicOracle, ContentOracle, SeoMetadata};
use dalbit::topic::{Card, CardKind, Topic};
use dalbit::utils::error::{CmsError, OracleError};

use super::fixtures::{anthropic_response, wp_post_response};

fn wp_client(server: &MockServer) -> WordPressClient {
    WordPressClient::new(WordPressConfig {
        base_url: server.uri(),
        username: "editor".to_string(),
        app_password: "abcd efgh ijkl".to_string(),
        timeout: Duration::from_secs(5),
    })
    .unwrap()
}

fn topic() -> Topic {
    Topic {
        primary: "INTJ".to_string(),
        situation: "연애 불안 (relationship anxiety)".to_string(),
        card_kind: CardKind::Tarot,
        card: Card::new("The Tower", "탑"),
    }
}

// ============================================================================
// WordPress
// ============================================================================

#[tokio::test]
async fn test_existing_term_is_reused() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/wp-json/wp/v2/tags"))
        .and(query_param("search", "INTJ"))
        .and(header_exists("authorization"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
            { "id": 3, "name": "INTJ 연애" },
            { "id": 7, "name": "INTJ" }
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let id = wp_client(&server)
        .find_or_create_term(TermKind::Tag, "INTJ")
        .await
        .unwrap();
    assert_eq!(id, 7);
}

#[tokio::test]
async fn test_missing_term_is_created() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/wp-json/wp/v2/categories"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/wp-json/wp/v2/categories"))
        .and(body_partial_json(serde_json::json!({ "name": "연애 심리" })))
        .respond_with(
            ResponseTemplate::new(201)
                .set_body_json(serde_json::json!({ "id": 42, "name": "연애 심리" })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let id = wp_client(&server)
        .find_or_create_term(TermKind::Category, "연애 심리")
        .await
        .unwrap();
    assert_eq!(id, 42);
}

#[tokio::test]
async fn test_term_exists_response_returns_existing_id() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/wp-json/wp/v2/tags"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/wp-json/wp/v2/tags"))
        .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
            "code": "term_exists",
            "message": "A term with the name provided already exists.",
            "data": { "status": 400, "term_id": 99 }
        })))
        .mount(&server)
        .await;

    let id = wp_client(&server)
        .find_or_create_term(TermKind::Tag, "탑")
        .await
        .unwrap();
    assert_eq!(id, 99);
}

#[tokio::test]
async fn test_scheduled_post_sends_local_and_gmt_dates() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/wp-json/wp/v2/posts"))
        .and(body_partial_json(serde_json::json!({
            "title": "INTJ 연애 불안 탑",
            "status": "future",
            "categories": [1, 2],
            "date": "2025-03-12T14:05:00",
            "date_gmt": "2025-03-12T05:05:00"
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(wp_post_response(501, "future")))
        .expect(1)
        .mount(&server)
        .await;

    let kst = FixedOffset::east_opt(9 * 3600).unwrap();
    let request = PostRequest {
        title: "INTJ 연애 불안 탑".to_string(),
        content: "## 지금의 마음\n본문".to_string(),
        status: PostStatus::Future,
        categories: vec![1, 2],
        tags: vec![],
        scheduled_at: Some(kst.with_ymd_and_hms(2025, 3, 12, 14, 5, 0).unwrap()),
    };

    let post = wp_client(&server).create_post(&request).await.unwrap();
    assert_eq!(post.id, 501);
    assert_eq!(post.status, PostStatus::Future);
    assert_eq!(post.url, "https://blog.example.com/?p=501");
}

#[tokio::test]
async fn test_post_body_is_rendered_as_html() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/wp-json/wp/v2/posts"))
        .and(body_partial_json(serde_json::json!({
            "content": "<h2>지금의 마음</h2>\n<p>A &lt;b&gt; 본문</p>\n"
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(wp_post_response(7, "draft")))
        .expect(1)
        .mount(&server)
        .await;

    let request = PostRequest {
        title: "제목".to_string(),
        content: "## 지금의 마음\nA <b> 본문".to_string(),
        status: PostStatus::Draft,
        categories: vec![],
        tags: vec![],
        scheduled_at: None,
    };

    wp_client(&server).create_post(&request).await.unwrap();
}

#[tokio::test]
async fn test_post_errors_are_classified() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/wp-json/wp/v2/posts"))
        .respond_with(ResponseTemplate::new(429))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/wp-json/wp/v2/posts"))
        .respond_with(ResponseTemplate::new(401).set_body_string("rest_cannot_create"))
        .mount(&server)
        .await;

    let client = wp_client(&server);
    let request = PostRequest {
        title: "제목".to_string(),
        content: "본문".to_string(),
        status: PostStatus::Publish,
        categories: vec![],
        tags: vec![],
        scheduled_at: None,
    };

    let first = client.create_post(&request).await.unwrap_err();
    assert!(matches!(first, CmsError::RateLimit));
    assert!(first.is_recoverable());

    let second = client.create_post(&request).await.unwrap_err();
    assert!(matches!(second, CmsError::Rejected { status: 401, .. }));
    assert!(!second.is_recoverable());
}

#[tokio::test]
async fn test_seo_update_writes_excerpt_and_meta() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/wp-json/wp/v2/posts/501"))
        .and(body_partial_json(serde_json::json!({ "excerpt": "타로로 읽는 INTJ의 불안" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(wp_post_response(501, "publish")))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/wp-json/wp/v2/posts/501"))
        .and(body_partial_json(serde_json::json!({
            "meta": { "_yoast_wpseo_metadesc": "타로로 읽는 INTJ의 불안" }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(wp_post_response(501, "publish")))
        .expect(1)
        .mount(&server)
        .await;

    let seo = SeoMetadata {
        description: "타로로 읽는 INTJ의 불안".to_string(),
        ..SeoMetadata::default()
    };
    wp_client(&server).update_seo(501, &seo).await.unwrap();
}

// ============================================================================
// Anthropic
// ============================================================================

fn oracle(server: &MockServer) -> AnthropicOracle {
    AnthropicOracle::new(AnthropicConfig {
        api_key: "sk-ant-test".to_string(),
        base_url: server.uri(),
        timeout: Duration::from_secs(5),
        ..AnthropicConfig::default()
    })
    .unwrap()
}

#[tokio::test]
async fn test_generate_parses_metadata_and_title() {
    let server = MockServer::start().await;
    let text = "META_DESCRIPTION: INTJ가 느끼는 연애 불안을 탑 카드로 읽어봅니다\n\
                OG_TITLE: INTJ 연애 불안과 탑 카드\n\
                IMAGE_ALT: 무너지는 탑 앞에 선 사람\n\
                ---\n\
                # INTJ의 연애 불안, 탑 카드가 말하는 것\n\
                ## 지금의 마음\n\
                본문입니다.";

    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .and(header("x-api-key", "sk-ant-test"))
        .and(header("anthropic-version", "2023-06-01"))
        .and(body_partial_json(serde_json::json!({ "model": "claude-sonnet-4-5" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(anthropic_response(text)))
        .expect(1)
        .mount(&server)
        .await;

    let draft = oracle(&server).generate(&topic()).await.unwrap();

    assert_eq!(draft.title, "INTJ의 연애 불안, 탑 카드가 말하는 것");
    assert!(draft.body.starts_with("## 지금의 마음"));
    assert_eq!(draft.metadata.og_title, "INTJ 연애 불안과 탑 카드");
    assert_eq!(draft.metadata.image_alt, "무너지는 탑 앞에 선 사람");
}

#[tokio::test]
async fn test_overloaded_is_recoverable() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .respond_with(ResponseTemplate::new(529).set_body_string("overloaded"))
        .mount(&server)
        .await;

    let err = oracle(&server).generate(&topic()).await.unwrap_err();
    assert!(matches!(err, OracleError::ServerError(529)));
    assert!(err.is_recoverable());
}

#[tokio::test]
async fn test_empty_completion_is_malformed() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "content": [],
            "usage": { "input_tokens": 10, "output_tokens": 0 }
        })))
        .mount(&server)
        .await;

    let err = oracle(&server).generate(&topic()).await.unwrap_err();
    assert!(matches!(err, OracleError::Malformed(_)));
    assert!(!err.is_recoverable());
}
