//! Core types for ParseKit

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Error text reported for fetches that hit the deadline
pub const TIMEOUT_MESSAGE: &str = "Timeout while fetching target URL";

/// Readable article produced by an [`Extractor`](crate::Extractor)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ExtractedArticle {
    /// Document URL (after redirects)
    pub url: String,

    /// Host name of the document URL
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,

    /// Article title
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    /// Author or byline
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,

    /// Publication date, RFC 3339 when it could be parsed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_published: Option<String>,

    /// Absolute URL of the lead image
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lead_image_url: Option<String>,

    /// Short summary of the article
    #[serde(skip_serializing_if = "Option::is_none")]
    pub excerpt: Option<String>,

    /// Main content as cleaned HTML
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,

    /// Number of words in the main content
    pub word_count: usize,
}

/// Diagnostics captured when the target answered with a non-2xx status
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpstreamDiagnostics {
    /// Upstream status code
    pub status: u16,
    /// Canonical reason phrase for the status
    pub status_text: String,
    /// Allow-listed response headers
    pub headers: BTreeMap<String, String>,
    /// First characters of the response body (at most 600)
    pub body_snippet: String,
}

/// Normalized result of one fetch-and-extract pipeline run
///
/// Every variant carries the requested URL.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// Document fetched and extracted
    Success { url: String, article: ExtractedArticle },
    /// Target answered outside 200-299
    UpstreamError {
        url: String,
        fetch: UpstreamDiagnostics,
    },
    /// No response (or body) before the deadline
    Timeout { url: String },
    /// Fetched content could not be turned into an article
    ExtractionError { url: String, message: String },
    /// Network or transport failure
    InternalError { url: String, message: String },
}

impl Outcome {
    /// Requested URL
    pub fn url(&self) -> &str {
        match self {
            Outcome::Success { url, .. }
            | Outcome::UpstreamError { url, .. }
            | Outcome::Timeout { url }
            | Outcome::ExtractionError { url, .. }
            | Outcome::InternalError { url, .. } => url,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success { .. })
    }

    /// Short variant name for logs
    pub fn kind(&self) -> &'static str {
        match self {
            Outcome::Success { .. } => "success",
            Outcome::UpstreamError { .. } => "upstream_error",
            Outcome::Timeout { .. } => "timeout",
            Outcome::ExtractionError { .. } => "extraction_error",
            Outcome::InternalError { .. } => "internal_error",
        }
    }

    /// Human-readable failure description, `None` for success
    pub fn error_message(&self) -> Option<String> {
        match self {
            Outcome::Success { .. } => None,
            Outcome::UpstreamError { fetch, .. } => Some(
                format!("Fetch failed: {} {}", fetch.status, fetch.status_text)
                    .trim_end()
                    .to_string(),
            ),
            Outcome::Timeout { .. } => Some(TIMEOUT_MESSAGE.to_string()),
            Outcome::ExtractionError { message, .. } | Outcome::InternalError { message, .. } => {
                Some(message.clone())
            }
        }
    }
}

/// Per-URL entry of a batch response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct BatchItemResult {
    /// URL as given in the request
    pub url: String,

    /// True when the article was extracted
    pub success: bool,

    /// Extracted article (success only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<ExtractedArticle>,

    /// Failure description (failure only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl BatchItemResult {
    /// Create a failed entry
    pub fn failure(url: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            success: false,
            data: None,
            error: Some(error.into()),
        }
    }
}

impl From<Outcome> for BatchItemResult {
    fn from(outcome: Outcome) -> Self {
        let error = outcome.error_message();
        match outcome {
            Outcome::Success { url, article } => Self {
                url,
                success: true,
                data: Some(article),
                error: None,
            },
            other => Self::failure(other.url(), error.unwrap_or_default()),
        }
    }
}

/// Batch response body
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct BatchResponse {
    /// One entry per requested URL, in request order
    pub results: Vec<BatchItemResult>,
}
