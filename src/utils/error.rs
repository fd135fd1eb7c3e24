//! Error types for external service calls
//!
//! Each error knows whether it is transient. The retry policy consults
//! `is_recoverable()` and never retries the rest.

use reqwest::StatusCode;
use thiserror::Error;

/// Errors from the content and image generation services
#[derive(Error, Debug)]
pub enum OracleError {
    /// HTTP transport error
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Rate limit exceeded
    #[error("Rate limit exceeded")]
    RateLimit,

    /// Server error with status code
    #[error("Server error: {0}")]
    ServerError(u16),

    /// Request refused by the service (bad key, bad request)
    #[error("Request rejected with status {status}: {body}")]
    Rejected { status: u16, body: String },

    /// Response did not have the expected shape
    #[error("Malformed response: {0}")]
    Malformed(String),

    /// Prompt template failed to render
    #[error("Prompt rendering failed: {0}")]
    Template(String),
}

impl OracleError {
    /// Classify a non-success HTTP status
    pub fn from_status(status: StatusCode, body: String) -> Self {
        if status == StatusCode::TOO_MANY_REQUESTS {
            Self::RateLimit
        } else if status.is_server_error() {
            Self::ServerError(status.as_u16())
        } else {
            Self::Rejected {
                status: status.as_u16(),
                body,
            }
        }
    }

    /// Transient failures worth another attempt
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Http(_) | Self::RateLimit | Self::ServerError(_))
    }
}

/// Errors from the CMS
#[derive(Error, Debug)]
pub enum CmsError {
    /// HTTP transport error
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Rate limit exceeded
    #[error("Rate limit exceeded")]
    RateLimit,

    /// Server error with status code
    #[error("Server error: {0}")]
    ServerError(u16),

    /// Request refused (authentication, validation)
    #[error("Request rejected with status {status}: {body}")]
    Rejected { status: u16, body: String },

    /// Response body could not be interpreted
    #[error("Unexpected response: {0}")]
    Unexpected(String),

    /// Client misconfiguration
    #[error("Invalid CMS configuration: {0}")]
    InvalidConfig(String),
}

impl CmsError {
    /// Classify a non-success HTTP status
    pub fn from_status(status: StatusCode, body: String) -> Self {
        if status == StatusCode::TOO_MANY_REQUESTS {
            Self::RateLimit
        } else if status.is_server_error() {
            Self::ServerError(status.as_u16())
        } else {
            Self::Rejected {
                status: status.as_u16(),
                body,
            }
        }
    }

    /// Transient failures worth another attempt
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Http(_) | Self::RateLimit | Self::ServerError(_))
    }
}
