use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::cache::StoreError;
use crate::providers::LlmError;

/// Errors that can occur inside an extraction run
#[derive(Error, Debug)]
pub enum ExtractError {
    /// URL is not an http(s) URL
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Failed to fetch a page or image
    #[error("Failed to fetch URL: {0}")]
    FetchError(#[from] reqwest::Error),

    /// Record store failure
    #[error("Store error: {0}")]
    StoreError(#[from] StoreError),

    /// Remote model call failed
    #[error("LLM error: {0}")]
    LlmError(#[from] LlmError),

    /// A tool needed page HTML but none was fetched for this request
    #[error("No page HTML available; call fetch_page first")]
    MissingHtml,

    /// A tool needed an extracted recipe but the context has none
    #[error("No recipe has been extracted for this request")]
    MissingRecipe,

    /// The model asked for a tool that is not in the registry
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    /// Tool arguments or results could not be (de)serialized
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(#[from] config::ConfigError),

    /// Builder configuration error
    #[error("Builder error: {0}")]
    BuilderError(String),

    /// A spawned tool task panicked or was aborted
    #[error("Tool task failed: {0}")]
    TaskError(String),
}

/// Stable error codes returned in the public result envelope.
///
/// Only `InvalidUrl`, `NoRecipeFound` and `LlmError` are produced today; the
/// rest are reserved so clients can match on them ahead of time.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    InvalidUrl,
    NoRecipeFound,
    LlmError,
    FetchFailed,
    ParseFailed,
    RateLimited,
    Timeout,
    Blocked,
}

impl ErrorCode {
    pub fn is_retryable(&self) -> bool {
        match self {
            ErrorCode::InvalidUrl | ErrorCode::NoRecipeFound | ErrorCode::ParseFailed => false,
            ErrorCode::Blocked => false,
            ErrorCode::LlmError
            | ErrorCode::FetchFailed
            | ErrorCode::RateLimited
            | ErrorCode::Timeout => true,
        }
    }
}

/// The error half of an `ExtractionResult`. Carries a message, never a trace.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExtractionError {
    pub code: ErrorCode,
    pub message: String,
    pub retryable: bool,
}

impl ExtractionError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        ExtractionError {
            code,
            message: message.into(),
            retryable: code.is_retryable(),
        }
    }
}
