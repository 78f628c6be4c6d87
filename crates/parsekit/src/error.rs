//! Error types for ParseKit
//!
//! Pipeline failures (timeouts, upstream errors, extraction failures) are not
//! errors at this level: they are values of [`Outcome`](crate::Outcome).
//! The enums here cover startup problems, request validation and the
//! extractor boundary.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

/// Errors raised while building the gateway at startup
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Environment variable holds something that is not a number
    #[error("Invalid value for {name}: {value:?} is not a valid number")]
    InvalidNumber { name: &'static str, value: String },

    /// Environment variable must be strictly positive
    #[error("Invalid value for {name}: must be greater than zero")]
    MustBePositive { name: &'static str },

    /// Header allow-list contains a name that is not a valid header
    #[error("Invalid header name in DIAGNOSTIC_HEADERS: {0:?}")]
    InvalidHeaderName(String),

    /// Failed to build HTTP client
    #[error("Failed to create HTTP client")]
    ClientBuildError(#[source] reqwest::Error),
}

/// Malformed request, rejected before any fetch is attempted
///
/// Always rendered as `400 {"error": ...}` regardless of the response mode.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// `url` query parameter missing or blank
    #[error("Parameter ?url= required")]
    MissingUrl,

    /// Batch body is not `{"urls": [...]}`
    #[error("Body must be a JSON object with a \"urls\" array")]
    InvalidBatch,

    /// Batch body is not valid JSON
    #[error("Invalid JSON body: {0}")]
    MalformedJson(String),
}

impl IntoResponse for ValidationError {
    fn into_response(self) -> Response {
        (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": self.to_string() })),
        )
            .into_response()
    }
}

/// Errors reported by an [`Extractor`](crate::Extractor)
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExtractError {
    /// Document has no markup at all
    #[error("Document is empty")]
    EmptyDocument,

    /// Document parsed but no readable text was found
    #[error("No readable content found in document")]
    NoContent,

    /// Content type cannot be turned into an article
    #[error("Unsupported content type: {0}")]
    UnsupportedContentType(String),

    /// Extractor-specific failure
    #[error("Extractor error: {0}")]
    Extractor(String),
}

/// Render an error together with its source chain
///
/// reqwest keeps the interesting part (DNS, TLS, connection refused) in the
/// sources, so the top-level message alone is rarely useful.
pub(crate) fn error_chain(err: &(dyn std::error::Error + 'static)) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        let cause_text = cause.to_string();
        if !message.contains(&cause_text) {
            message.push_str(": ");
            message.push_str(&cause_text);
        }
        source = cause.source();
    }
    message
}
