//! Unified error handling for the dalbit crate
//!
//! Each subsystem keeps its own error enum. [`Error`] wraps them so the CLI
//! and other callers can work with a single type and still ask whether a
//! failure is worth retrying.
//!
//! # Usage
//!
//! ```rust,ignore
//! use dalbit::error::{DalbitErrorTrait, Error};
//!
//! fn report(err: &Error) {
//!     if err.is_recoverable() {
//!         eprintln!("Retry later: {}", err.localized_desc());
//!     } else {
//!         eprintln!("Fatal: {}", err);
//!     }
//! }
//! ```

use std::io;
use thiserror::Error;

pub use crate::ledger::LedgerError;
pub use crate::pipeline::PipelineError;
pub use crate::schedule::ScheduleError;
pub use crate::topic::TopicError;
pub use crate::utils::error::{CmsError, OracleError};

use crate::i18n::t;

/// Common interface for dalbit errors
pub trait DalbitErrorTrait: std::error::Error {
    /// Whether retrying the operation could succeed
    fn is_recoverable(&self) -> bool;

    /// Localized description for user-facing messages
    fn localized_desc(&self) -> String;

    /// Error category for handling strategies
    fn category(&self) -> ErrorCategory;
}

/// Classification of errors for handling strategies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// CMS and HTTP failures
    Network,
    /// Generated content could not be used
    Content,
    /// Ledger and file system failures
    Storage,
    /// Text or image generation failures
    Llm,
    /// Invalid or missing configuration
    Config,
    /// The topic pool ran out of unused combinations
    Exhaustion,
    Other,
}

impl ErrorCategory {
    /// Localized category name
    pub fn localized_desc(&self) -> String {
        match self {
            Self::Network => t!("errors.category.network").to_string(),
            Self::Content => t!("errors.category.content").to_string(),
            Self::Storage => t!("errors.category.storage").to_string(),
            Self::Llm => t!("errors.category.llm").to_string(),
            Self::Config => t!("errors.category.config").to_string(),
            Self::Exhaustion => t!("errors.category.exhaustion").to_string(),
            Self::Other => t!("errors.category.other").to_string(),
        }
    }
}

/// Unified error type for the dalbit crate
#[derive(Error, Debug)]
pub enum Error {
    #[error("Topic error: {0}")]
    Topic(#[from] TopicError),

    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("Generation error: {0}")]
    Oracle(#[from] OracleError),

    #[error("CMS error: {0}")]
    Cms(#[from] CmsError),

    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    #[error("Schedule error: {0}")]
    Schedule(#[from] ScheduleError),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Config error: {0}")]
    Config(String),

    /// Generic error with context
    #[error("{context}")]
    Other {
        context: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl DalbitErrorTrait for Error {
    fn is_recoverable(&self) -> bool {
        match self {
            Self::Topic(e) => e.is_recoverable(),
            Self::Ledger(_) => false,
            Self::Oracle(e) => e.is_recoverable(),
            Self::Cms(e) => e.is_recoverable(),
            Self::Pipeline(e) => match e {
                PipelineError::Topic(e) => e.is_recoverable(),
                PipelineError::Generation { source, .. } => source.is_recoverable(),
                PipelineError::Persistence { .. } => false,
            },
            Self::Io(_) => true,
            Self::Schedule(_) | Self::Json(_) | Self::Config(_) | Self::Other { .. } => false,
        }
    }

    fn localized_desc(&self) -> String {
        match self {
            Self::Topic(TopicError::Exhausted { attempts }) => {
                t!("errors.topic.exhausted", attempts = attempts).to_string()
            }
            Self::Pipeline(PipelineError::Topic(TopicError::Exhausted { attempts })) => {
                t!("errors.topic.exhausted", attempts = attempts).to_string()
            }
            Self::Pipeline(PipelineError::Persistence { key, source }) => {
                format!("{} ({key}): {source}", t!("errors.ledger.write_failed"))
            }
            Self::Oracle(OracleError::RateLimit) | Self::Cms(CmsError::RateLimit) => {
                t!("errors.http.rate_limit").to_string()
            }
            Self::Io(e) => format!("{}: {e}", t!("errors.io.error")),
            Self::Json(e) => format!("{}: {e}", t!("errors.json.error")),
            Self::Config(msg) => format!("{}: {msg}", t!("errors.config.error")),
            Self::Other { context, .. } => context.clone(),
            other => format!("{}: {other}", other.category().localized_desc()),
        }
    }

    fn category(&self) -> ErrorCategory {
        match self {
            Self::Topic(TopicError::Exhausted { .. })
            | Self::Pipeline(PipelineError::Topic(TopicError::Exhausted { .. })) => {
                ErrorCategory::Exhaustion
            }
            Self::Topic(TopicError::Ledger(_))
            | Self::Pipeline(PipelineError::Topic(TopicError::Ledger(_))) => ErrorCategory::Storage,
            Self::Topic(_) | Self::Pipeline(PipelineError::Topic(_)) => ErrorCategory::Config,
            Self::Oracle(OracleError::Malformed(_)) => ErrorCategory::Content,
            Self::Oracle(_) | Self::Pipeline(PipelineError::Generation { .. }) => {
                ErrorCategory::Llm
            }
            Self::Cms(CmsError::InvalidConfig(_)) => ErrorCategory::Config,
            Self::Cms(_) => ErrorCategory::Network,
            Self::Ledger(_) | Self::Pipeline(PipelineError::Persistence { .. }) | Self::Io(_) => {
                ErrorCategory::Storage
            }
            Self::Json(_) => ErrorCategory::Content,
            Self::Schedule(_) | Self::Config(_) => ErrorCategory::Config,
            Self::Other { .. } => ErrorCategory::Other,
        }
    }
}

impl Error {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a generic error with context
    pub fn other(context: impl Into<String>) -> Self {
        Self::Other {
            context: context.into(),
            source: None,
        }
    }

    /// Create a generic error with context and source
    pub fn with_source(
        context: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Other {
            context: context.into(),
            source: Some(Box::new(source)),
        }
    }
}

impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::Other {
            context: err.to_string(),
            source: None,
        }
    }
}

/// Result type alias using the unified Error type
pub type Result<T> = std::result::Result<T, Error>;
