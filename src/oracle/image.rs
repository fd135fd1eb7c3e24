//! Featured image generation via the OpenAI Images API

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::{ImageOracle, PromptRenderer};
use crate::topic::Topic;
use crate::utils::error::OracleError;

/// Configuration for the image client
#[derive(Debug, Clone)]
pub struct OpenAiImageConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub size: String,
    pub timeout: Duration,
}

impl Default for OpenAiImageConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: "https://api.openai.com".to_string(),
            model: "dall-e-3".to_string(),
            size: "1024x1024".to_string(),
            timeout: Duration::from_secs(120),
        }
    }
}

#[derive(Debug, Serialize)]
struct ImageRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    size: &'a str,
    quality: &'static str,
    n: u8,
}

#[derive(Debug, Deserialize)]
struct ImageResponse {
    #[serde(default)]
    data: Vec<ImageData>,
}

#[derive(Debug, Deserialize)]
struct ImageData {
    url: Option<String>,
}

/// Requests one image and downloads it
pub struct OpenAiImageOracle {
    client: Client,
    config: OpenAiImageConfig,
    prompts: PromptRenderer,
}

impl OpenAiImageOracle {
    pub fn new(config: OpenAiImageConfig) -> Result<Self, OracleError> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self {
            client,
            config,
            prompts: PromptRenderer::new()?,
        })
    }
}

#[async_trait]
impl ImageOracle for OpenAiImageOracle {
    async fn generate_image(&self, topic: &Topic) -> Result<Bytes, OracleError> {
        let prompt = self.prompts.image_prompt(topic)?;
        let url = format!(
            "{}/v1/images/generations",
            self.config.base_url.trim_end_matches('/')
        );

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .json(&ImageRequest {
                model: &self.config.model,
                prompt: &prompt,
                size: &self.config.size,
                quality: "standard",
                n: 1,
            })
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(OracleError::from_status(status, body));
        }

        let parsed: ImageResponse = response
            .json()
            .await
            .map_err(|e| OracleError::Malformed(e.to_string()))?;
        let image_url = parsed
            .data
            .into_iter()
            .find_map(|d| d.url)
            .ok_or_else(|| OracleError::Malformed("no image url in response".to_string()))?;

        let download = self.client.get(&image_url).send().await?;
        if !download.status().is_success() {
            let status = download.status();
            return Err(OracleError::from_status(status, String::new()));
        }
        let bytes = download.bytes().await?;

        tracing::info!(key = %topic.key(), size = bytes.len(), "Image generated");
        Ok(bytes)
    }
}
