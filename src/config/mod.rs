//! Configuration management for dalbit
//!
//! Settings come from environment variables (optionally seeded from a `.env`
//! file by the binary) or from a TOML file, and are validated before any
//! client is built.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::cms::{PostStatus, WordPressConfig};
use crate::oracle::{AnthropicConfig, OpenAiImageConfig};
use crate::schedule::{PublishWindows, KST_OFFSET_HOURS};
use crate::utils::retry::RetryPolicy;
use crate::validator::{ContentValidator, DisclaimerRule};

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub wordpress: WordPressSettings,
    pub anthropic: AnthropicSettings,
    pub openai: OpenAiSettings,
    pub database: DatabaseConfig,
    pub publish: PublishConfig,
    pub logging: LoggingConfig,
}

/// WordPress site and credentials
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WordPressSettings {
    /// Site root, e.g. `https://blog.example.com`
    pub url: String,
    pub username: String,
    /// Application password
    pub app_password: String,
}

/// Text generation settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnthropicSettings {
    pub api_key: String,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl Default for AnthropicSettings {
    fn default() -> Self {
        let defaults = AnthropicConfig::default();
        Self {
            api_key: String::new(),
            model: defaults.model,
            max_tokens: defaults.max_tokens,
            temperature: defaults.temperature,
        }
    }
}

/// Image generation settings; images are skipped without an API key
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenAiSettings {
    pub api_key: Option<String>,
}

/// Ledger location
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub sqlite_path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            sqlite_path: PathBuf::from("data/dalbit.db"),
        }
    }
}

/// Publishing behavior
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PublishConfig {
    /// Status used when content passes validation
    pub status: PostStatus,

    /// Rewrite forbidden vocabulary before downgrading to draft
    pub auto_sanitize: bool,

    /// Require every disclaimer keyword instead of the default phrase
    pub strict_disclaimer: bool,

    /// Hours east of UTC used for publish windows
    pub utc_offset_hours: i32,

    /// Defer `publish` outside the publish windows
    pub use_windows: bool,

    /// Timeout for every outbound HTTP request, in seconds
    pub request_timeout_secs: u64,

    /// Attempts per external call, including the first
    pub max_attempts: u32,

    /// First retry delay in seconds
    pub retry_base_delay_secs: u64,
}

impl Default for PublishConfig {
    fn default() -> Self {
        Self {
            status: PostStatus::Draft,
            auto_sanitize: true,
            strict_disclaimer: false,
            utc_offset_hours: KST_OFFSET_HOURS,
            use_windows: true,
            request_timeout_secs: 120,
            max_attempts: 3,
            retry_base_delay_secs: 2,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Log format (text, json)
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: String::from("info"),
            format: String::from("text"),
        }
    }
}

fn env_string(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    env_string(name).and_then(|v| v.trim().parse().ok())
}

fn env_bool(name: &str) -> Option<bool> {
    env_string(name).map(|v| {
        matches!(
            v.trim().to_lowercase().as_str(),
            "1" | "true" | "yes" | "on"
        )
    })
}

impl Config {
    /// Load configuration from environment variables
    ///
    /// Unset or unparsable variables keep their defaults; required values
    /// are checked by [`Config::validate`].
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let status = match env_string("WORDPRESS_STATUS") {
            Some(raw) => raw
                .parse::<PostStatus>()
                .map_err(anyhow::Error::msg)
                .context("Invalid WORDPRESS_STATUS")?,
            None => defaults.publish.status,
        };

        Ok(Self {
            wordpress: WordPressSettings {
                url: env_string("WORDPRESS_URL").unwrap_or_default(),
                username: env_string("WORDPRESS_USERNAME").unwrap_or_default(),
                app_password: env_string("WORDPRESS_APP_PASSWORD").unwrap_or_default(),
            },
            anthropic: AnthropicSettings {
                api_key: env_string("ANTHROPIC_API_KEY").unwrap_or_default(),
                model: env_string("ANTHROPIC_MODEL").unwrap_or(defaults.anthropic.model),
                ..defaults.anthropic
            },
            openai: OpenAiSettings {
                api_key: env_string("OPENAI_API_KEY"),
            },
            database: DatabaseConfig {
                sqlite_path: env_string("DALBIT_DB_PATH")
                    .map(PathBuf::from)
                    .unwrap_or(defaults.database.sqlite_path),
            },
            publish: PublishConfig {
                status,
                auto_sanitize: env_bool("DALBIT_AUTO_SANITIZE")
                    .unwrap_or(defaults.publish.auto_sanitize),
                strict_disclaimer: env_bool("DALBIT_STRICT_DISCLAIMER")
                    .unwrap_or(defaults.publish.strict_disclaimer),
                utc_offset_hours: env_parse("DALBIT_UTC_OFFSET_HOURS")
                    .unwrap_or(defaults.publish.utc_offset_hours),
                request_timeout_secs: env_parse("DALBIT_REQUEST_TIMEOUT")
                    .unwrap_or(defaults.publish.request_timeout_secs),
                ..defaults.publish
            },
            logging: LoggingConfig {
                level: env_string("DALBIT_LOG_LEVEL").unwrap_or(defaults.logging.level),
                format: env_string("DALBIT_LOG_FORMAT").unwrap_or(defaults.logging.format),
            },
        })
    }

    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse TOML config file: {}", path.display()))?;

        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.wordpress.url.is_empty() {
            anyhow::bail!("WordPress URL is required (WORDPRESS_URL)");
        }
        url::Url::parse(&self.wordpress.url)
            .with_context(|| format!("Invalid WordPress URL: {}", self.wordpress.url))?;

        if self.wordpress.username.is_empty() || self.wordpress.app_password.is_empty() {
            anyhow::bail!(
                "WordPress credentials are required (WORDPRESS_USERNAME, WORDPRESS_APP_PASSWORD)"
            );
        }

        if self.anthropic.api_key.is_empty() {
            anyhow::bail!("Anthropic API key is required (ANTHROPIC_API_KEY)");
        }

        if self.publish.request_timeout_secs == 0 {
            anyhow::bail!("request_timeout_secs must be greater than 0");
        }

        if self.publish.max_attempts == 0 {
            anyhow::bail!("max_attempts must be greater than 0");
        }

        self.publish_windows()?;

        Ok(())
    }

    /// Get request timeout as Duration
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.publish.request_timeout_secs)
    }

    /// Retry policy for external calls
    #[must_use]
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.publish.max_attempts,
            Duration::from_secs(self.publish.retry_base_delay_secs),
            RetryPolicy::default().max_delay,
        )
    }

    #[must_use]
    pub fn disclaimer_rule(&self) -> DisclaimerRule {
        if self.publish.strict_disclaimer {
            DisclaimerRule::strict()
        } else {
            DisclaimerRule::standard()
        }
    }

    #[must_use]
    pub fn validator(&self) -> ContentValidator {
        ContentValidator::new(self.disclaimer_rule())
    }

    /// Publish windows and slots in the configured UTC offset
    ///
    /// Built even when `use_windows` is off, since `future` posts still need slots.
    pub fn publish_windows(&self) -> Result<PublishWindows> {
        PublishWindows::with_offset_hours(self.publish.utc_offset_hours)
            .context("Invalid UTC offset")
    }

    #[must_use]
    pub fn wordpress_config(&self) -> WordPressConfig {
        WordPressConfig {
            base_url: self.wordpress.url.clone(),
            username: self.wordpress.username.clone(),
            app_password: self.wordpress.app_password.clone(),
            timeout: self.request_timeout(),
        }
    }

    #[must_use]
    pub fn anthropic_config(&self) -> AnthropicConfig {
        AnthropicConfig {
            api_key: self.anthropic.api_key.clone(),
            model: self.anthropic.model.clone(),
            max_tokens: self.anthropic.max_tokens,
            temperature: self.anthropic.temperature,
            timeout: self.request_timeout(),
            ..AnthropicConfig::default()
        }
    }

    /// Image client settings, if an OpenAI key is configured
    #[must_use]
    pub fn image_config(&self) -> Option<OpenAiImageConfig> {
        let api_key = self.openai.api_key.clone()?;
        Some(OpenAiImageConfig {
            api_key,
            timeout: self.request_timeout(),
            ..OpenAiImageConfig::default()
        })
    }
}
