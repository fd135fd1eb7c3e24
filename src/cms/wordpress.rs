//! WordPress REST v2 client
//!
//! Authenticates with an application password over basic auth. Post bodies
//! are rendered from Markdown before upload.

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{Client, RequestBuilder, Response};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::time::Duration;
use url::Url;

use super::html::markdown_to_html;
use super::{Cms, PostRequest, PostStatus, PublishedPost, TermKind};
use crate::oracle::SeoMetadata;
use crate::utils::error::CmsError;

const WP_DATE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Connection settings for one WordPress site
#[derive(Debug, Clone)]
pub struct WordPressConfig {
    /// Site URL, e.g. `https://blog.example.com`
    pub base_url: String,
    pub username: String,
    pub app_password: String,
    pub timeout: Duration,
}

#[derive(Debug, Deserialize)]
struct WpTerm {
    id: u64,
    #[serde(default)]
    name: String,
}

#[derive(Debug, Deserialize)]
struct WpPost {
    id: u64,
    #[serde(default)]
    link: String,
    #[serde(default)]
    status: String,
}

#[derive(Debug, Deserialize)]
struct WpMedia {
    id: u64,
}

/// WordPress implementation of [`Cms`]
pub struct WordPressClient {
    client: Client,
    api_url: String,
    username: String,
    app_password: String,
}

impl WordPressClient {
    /// Create a client for the site
    pub fn new(config: WordPressConfig) -> Result<Self, CmsError> {
        let base = config.base_url.trim_end_matches('/');
        Url::parse(base).map_err(|e| CmsError::InvalidConfig(format!("{base}: {e}")))?;

        if config.username.is_empty() || config.app_password.is_empty() {
            return Err(CmsError::InvalidConfig(
                "username and application password are required".to_string(),
            ));
        }

        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(CmsError::Http)?;

        Ok(Self {
            client,
            api_url: format!("{base}/wp-json/wp/v2"),
            username: config.username,
            app_password: config.app_password,
        })
    }

    /// REST root, e.g. `https://blog.example.com/wp-json/wp/v2`
    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    fn get(&self, path: &str) -> RequestBuilder {
        self.client
            .get(format!("{}/{path}", self.api_url))
            .basic_auth(&self.username, Some(&self.app_password))
    }

    fn post(&self, path: &str) -> RequestBuilder {
        self.client
            .post(format!("{}/{path}", self.api_url))
            .basic_auth(&self.username, Some(&self.app_password))
    }

    async fn check(response: Response) -> Result<Response, CmsError> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        Err(CmsError::from_status(status, body))
    }

    async fn search_term(&self, kind: TermKind, name: &str) -> Result<Option<u64>, CmsError> {
        let response = self
            .get(kind.endpoint())
            .query(&[("search", name)])
            .send()
            .await?;
        let terms: Vec<WpTerm> = Self::check(response)
            .await?
            .json()
            .await
            .map_err(|e| CmsError::Unexpected(e.to_string()))?;

        Ok(terms
            .into_iter()
            .find(|t| html_escape::decode_html_entities(&t.name).eq_ignore_ascii_case(name))
            .map(|t| t.id))
    }

    async fn update_post(&self, post_id: u64, body: &Value) -> Result<(), CmsError> {
        let response = self
            .post(&format!("posts/{post_id}"))
            .json(body)
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }
}

/// Yoast SEO and Rank Math meta fields for the metadata
fn seo_meta_fields(seo: &SeoMetadata) -> Map<String, Value> {
    let mut meta = Map::new();
    let mut set = |keys: &[&str], value: &str| {
        if !value.is_empty() {
            for key in keys {
                meta.insert((*key).to_string(), Value::String(value.to_string()));
            }
        }
    };

    set(
        &["_yoast_wpseo_metadesc", "rank_math_description"],
        &seo.description,
    );
    set(
        &[
            "_yoast_wpseo_opengraph-title",
            "_yoast_wpseo_twitter-title",
            "rank_math_facebook_title",
            "rank_math_twitter_title",
        ],
        &seo.og_title,
    );
    set(
        &[
            "_yoast_wpseo_opengraph-description",
            "_yoast_wpseo_twitter-description",
            "rank_math_facebook_description",
            "rank_math_twitter_description",
        ],
        &seo.og_description,
    );

    meta
}

#[async_trait]
impl Cms for WordPressClient {
    async fn find_or_create_term(&self, kind: TermKind, name: &str) -> Result<u64, CmsError> {
        if let Some(id) = self.search_term(kind, name).await? {
            tracing::debug!(%kind, name, id, "Found existing term");
            return Ok(id);
        }

        let response = self
            .post(kind.endpoint())
            .json(&json!({ "name": name }))
            .send()
            .await?;

        // A concurrent creation or a search miss surfaces as `term_exists`
        if response.status() == reqwest::StatusCode::BAD_REQUEST {
            let body: Value = response.json().await.unwrap_or(Value::Null);
            if let Some(id) = body.pointer("/data/term_id").and_then(Value::as_u64) {
                return Ok(id);
            }
            return Err(CmsError::Rejected {
                status: 400,
                body: body.to_string(),
            });
        }

        let term: WpTerm = Self::check(response)
            .await?
            .json()
            .await
            .map_err(|e| CmsError::Unexpected(e.to_string()))?;

        tracing::info!(%kind, name, id = term.id, "Created term");
        Ok(term.id)
    }

    async fn create_post(&self, post: &PostRequest) -> Result<PublishedPost, CmsError> {
        let mut body = json!({
            "title": post.title,
            "content": markdown_to_html(&post.content),
            "status": post.status.as_wp_str(),
        });

        if !post.categories.is_empty() {
            body["categories"] = json!(post.categories);
        }
        if !post.tags.is_empty() {
            body["tags"] = json!(post.tags);
        }
        if let Some(at) = post.scheduled_at {
            body["date"] = json!(at.naive_local().format(WP_DATE_FORMAT).to_string());
            body["date_gmt"] = json!(at.naive_utc().format(WP_DATE_FORMAT).to_string());
        }

        let response = self.post("posts").json(&body).send().await?;
        let created: WpPost = Self::check(response)
            .await?
            .json()
            .await
            .map_err(|e| CmsError::Unexpected(e.to_string()))?;

        tracing::info!(post_id = created.id, status = %created.status, "Post created");

        Ok(PublishedPost {
            id: created.id,
            url: created.link,
            status: PostStatus::from_wp(&created.status),
        })
    }

    async fn upload_media(
        &self,
        data: Bytes,
        filename: &str,
        alt_text: &str,
    ) -> Result<u64, CmsError> {
        let response = self
            .post("media")
            .header(
                reqwest::header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{filename}\""),
            )
            .header(reqwest::header::CONTENT_TYPE, "image/jpeg")
            .body(data)
            .send()
            .await?;
        let media: WpMedia = Self::check(response)
            .await?
            .json()
            .await
            .map_err(|e| CmsError::Unexpected(e.to_string()))?;

        if !alt_text.is_empty() {
            let response = self
                .post(&format!("media/{}", media.id))
                .json(&json!({ "alt_text": alt_text }))
                .send()
                .await?;
            if let Err(e) = Self::check(response).await {
                tracing::warn!(media_id = media.id, error = %e, "Failed to set image alt text");
            }
        }

        tracing::info!(media_id = media.id, filename, "Image uploaded");
        Ok(media.id)
    }

    async fn set_featured_media(&self, post_id: u64, media_id: u64) -> Result<(), CmsError> {
        self.update_post(post_id, &json!({ "featured_media": media_id }))
            .await?;
        tracing::info!(post_id, media_id, "Featured image set");
        Ok(())
    }

    async fn update_seo(&self, post_id: u64, seo: &SeoMetadata) -> Result<(), CmsError> {
        if !seo.description.is_empty() {
            self.update_post(post_id, &json!({ "excerpt": seo.description }))
                .await?;
        }

        let meta = seo_meta_fields(seo);
        if !meta.is_empty() {
            self.update_post(post_id, &json!({ "meta": meta })).await?;
        }

        tracing::debug!(post_id, "SEO meta updated");
        Ok(())
    }
}
