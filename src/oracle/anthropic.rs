//! Anthropic Messages API client

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::parse::parse_response;
use super::{ContentDraft, ContentOracle, PeriodicOracle, PromptRenderer};
use crate::schedule::WeekPeriod;
use crate::topic::Topic;
use crate::utils::error::OracleError;

const API_VERSION: &str = "2023-06-01";

/// Configuration for the Anthropic client
#[derive(Debug, Clone)]
pub struct AnthropicConfig {
    pub api_key: String,

    /// Model name
    pub model: String,

    /// API endpoint (default: https://api.anthropic.com)
    pub base_url: String,

    /// Maximum tokens to generate
    pub max_tokens: u32,

    /// Temperature for generation (0.0 - 1.0)
    pub temperature: f32,

    /// Request timeout
    pub timeout: Duration,
}

impl Default for AnthropicConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: "claude-sonnet-4-5".to_string(),
            base_url: "https://api.anthropic.com".to_string(),
            max_tokens: 6000,
            temperature: 0.7,
            timeout: Duration::from_secs(120),
        }
    }
}

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    messages: [Message<'a>; 1],
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: String,
}

#[derive(Debug, Deserialize)]
struct Usage {
    input_tokens: u64,
    output_tokens: u64,
}

/// Content and weekly generation backed by Claude
pub struct AnthropicOracle {
    client: Client,
    config: AnthropicConfig,
    prompts: PromptRenderer,
}

impl AnthropicOracle {
    /// Create a new client with custom config
    pub fn new(config: AnthropicConfig) -> Result<Self, OracleError> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self {
            client,
            config,
            prompts: PromptRenderer::new()?,
        })
    }

    /// Send one user message and return the concatenated text blocks
    pub async fn complete(&self, prompt: &str) -> Result<String, OracleError> {
        let url = format!("{}/v1/messages", self.config.base_url.trim_end_matches('/'));
        let request = MessagesRequest {
            model: &self.config.model,
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
            messages: [Message {
                role: "user",
                content: prompt,
            }],
        };

        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.config.api_key)
            .header("anthropic-version", API_VERSION)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(OracleError::from_status(status, body));
        }

        let parsed: MessagesResponse = response
            .json()
            .await
            .map_err(|e| OracleError::Malformed(e.to_string()))?;

        if let Some(usage) = &parsed.usage {
            tracing::info!(
                model = %self.config.model,
                tokens = usage.input_tokens + usage.output_tokens,
                "Claude API call successful"
            );
        }

        let text: String = parsed
            .content
            .into_iter()
            .filter(|block| block.kind == "text")
            .map(|block| block.text)
            .collect();

        if text.trim().is_empty() {
            return Err(OracleError::Malformed(
                "response contained no text".to_string(),
            ));
        }

        Ok(text)
    }
}

#[async_trait]
impl ContentOracle for AnthropicOracle {
    async fn generate(&self, topic: &Topic) -> Result<ContentDraft, OracleError> {
        tracing::info!(key = %topic.key(), "Generating content");
        let prompt = self.prompts.content_prompt(topic)?;
        let text = self.complete(&prompt).await?;
        parse_response(&text)
    }
}

#[async_trait]
impl PeriodicOracle for AnthropicOracle {
    async fn generate_weekly(
        &self,
        subject: &str,
        week: &WeekPeriod,
    ) -> Result<ContentDraft, OracleError> {
        tracing::info!(subject, week = %week.label(), "Generating weekly content");
        let prompt = self.prompts.weekly_prompt(subject, week)?;
        let text = self.complete(&prompt).await?;
        parse_response(&text)
    }
}
