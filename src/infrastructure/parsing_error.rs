//! Parsing error types for listing and detail page extraction
//!
//! Every variant carries enough context (URL, selector, JSON path) to
//! reproduce the failing step from a log line.

use thiserror::Error;

use super::request_executor::FetchError;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParsingError {
    #[error("No embedded data script found on {url} (tried {tried_selectors:?})")]
    ScriptNotFound {
        url: String,
        tried_selectors: Vec<String>,
    },

    #[error("Invalid embedded JSON on {url}: {reason}")]
    InvalidJson { url: String, reason: String },

    #[error("Expected structure missing on {url} at '{path}'")]
    MissingStructure { url: String, path: String },

    #[error("No ad identifier in listing URL {url}")]
    MissingAdId { url: String },

    #[error("Invalid listing URL '{url}': {reason}")]
    InvalidListingUrl { url: String, reason: String },

    #[error("URL resolution failed: {url} against {base_url} - {reason}")]
    UrlResolutionFailed {
        url: String,
        reason: String,
        base_url: String,
    },

    #[error("Invalid CSS selector: {selector} - {reason}")]
    InvalidSelector { selector: String, reason: String },
}

impl ParsingError {
    pub fn script_not_found(url: &str, tried_selectors: &[String]) -> Self {
        Self::ScriptNotFound {
            url: url.to_string(),
            tried_selectors: tried_selectors.to_vec(),
        }
    }

    pub fn invalid_json(url: &str, err: &serde_json::Error) -> Self {
        Self::InvalidJson {
            url: url.to_string(),
            reason: err.to_string(),
        }
    }

    pub fn missing_structure(url: &str, path: &str) -> Self {
        Self::MissingStructure {
            url: url.to_string(),
            path: path.to_string(),
        }
    }

    pub fn invalid_selector(selector: &str, reason: &str) -> Self {
        Self::InvalidSelector {
            selector: selector.to_string(),
            reason: reason.to_string(),
        }
    }
}

pub type ParsingResult<T> = Result<T, ParsingError>;

/// Why a single listing was skipped.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExtractionError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Parsing(#[from] ParsingError),
}
