//! Normalization of raw fetch results
//!
//! Turns a [`RawFetchOutcome`] into either a document ready for extraction or
//! a final [`Outcome`]. The status code is inspected before the body is read,
//! so error pages are never buffered beyond a short diagnostic snippet.

use crate::config::Config;
use crate::error::{error_chain, ExtractError};
use crate::fetcher::RawFetchOutcome;
use crate::types::{Outcome, UpstreamDiagnostics};
use bytes::Bytes;
use futures::StreamExt;
use reqwest::header::{HeaderName, CONTENT_TYPE};
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{debug, warn};

/// Maximum characters of an error body kept for diagnostics
pub const SNIPPET_MAX_CHARS: usize = 600;

/// Bytes read from an error body (enough for the snippet in any UTF-8 text)
const SNIPPET_MAX_BYTES: usize = SNIPPET_MAX_CHARS * 4;

/// Binary content type prefixes
const BINARY_PREFIXES: &[&str] = &[
    "image/",
    "audio/",
    "video/",
    "application/octet-stream",
    "application/pdf",
    "application/zip",
    "application/gzip",
    "application/x-tar",
    "application/x-rar",
    "application/x-7z",
    "application/vnd.ms-",
    "application/vnd.openxmlformats",
    "font/",
];

/// Successfully fetched document, ready for extraction
#[derive(Debug, Clone, PartialEq)]
pub struct FetchedDocument {
    /// URL as requested
    pub url: String,
    /// URL after redirects
    pub final_url: String,
    /// Content-Type header value
    pub content_type: Option<String>,
    /// Response body decoded as text
    pub html: String,
}

/// Result of classification
#[derive(Debug)]
pub enum Classified {
    /// 2xx response with its body; continue with extraction
    Document(FetchedDocument),
    /// Pipeline finished here
    Done(Outcome),
}

/// How a body read ended
#[derive(Debug, Clone, PartialEq, Eq)]
enum BodyEnd {
    Complete,
    LimitReached,
    TimedOut,
    Failed(String),
}

/// Response classifier
#[derive(Debug, Clone)]
pub struct Classifier {
    diagnostic_headers: Vec<HeaderName>,
    body_timeout: Duration,
    max_body_bytes: usize,
}

impl Classifier {
    pub fn new(config: &Config) -> Self {
        Self {
            diagnostic_headers: config.diagnostic_headers.clone(),
            body_timeout: config.body_timeout,
            max_body_bytes: config.max_body_bytes,
        }
    }

    /// Normalize a raw fetch result for `url`
    pub async fn classify(&self, url: &str, raw: RawFetchOutcome) -> Classified {
        match raw {
            RawFetchOutcome::Aborted => Classified::Done(Outcome::Timeout {
                url: url.to_string(),
            }),
            RawFetchOutcome::NetworkFailure { message } => {
                Classified::Done(Outcome::InternalError {
                    url: url.to_string(),
                    message,
                })
            }
            RawFetchOutcome::HttpResponse(response) if response.status().is_success() => {
                self.accept(url, response).await
            }
            RawFetchOutcome::HttpResponse(response) => {
                Classified::Done(self.upstream_error(url, response).await)
            }
        }
    }

    async fn accept(&self, url: &str, response: reqwest::Response) -> Classified {
        let content_type = header_value(&response, &CONTENT_TYPE);

        if let Some(ref ct) = content_type {
            if is_binary_content_type(ct) {
                return Classified::Done(Outcome::ExtractionError {
                    url: url.to_string(),
                    message: ExtractError::UnsupportedContentType(ct.clone()).to_string(),
                });
            }
        }

        if let Some(length) = response.content_length() {
            if length > self.max_body_bytes as u64 {
                return Classified::Done(self.too_large(url));
            }
        }

        let final_url = response.url().to_string();
        let (body, end) = read_body(response, self.body_timeout, self.max_body_bytes).await;

        match end {
            BodyEnd::Complete => Classified::Document(FetchedDocument {
                url: url.to_string(),
                final_url,
                content_type,
                html: String::from_utf8_lossy(&body).into_owned(),
            }),
            BodyEnd::LimitReached => Classified::Done(self.too_large(url)),
            BodyEnd::TimedOut => {
                warn!(url, bytes = body.len(), "body timeout reached");
                Classified::Done(Outcome::Timeout {
                    url: url.to_string(),
                })
            }
            BodyEnd::Failed(message) => Classified::Done(Outcome::InternalError {
                url: url.to_string(),
                message: format!("Failed to read response body: {message}"),
            }),
        }
    }

    async fn upstream_error(&self, url: &str, response: reqwest::Response) -> Outcome {
        let status = response.status();
        let headers = self.header_subset(&response);

        // Best effort: whatever arrived before an error or the deadline is kept
        let (body, end) = read_body(response, self.body_timeout, SNIPPET_MAX_BYTES).await;
        if let BodyEnd::Failed(ref message) = end {
            debug!(url, %message, "could not read error body");
        }
        let body_snippet = truncate_chars(&String::from_utf8_lossy(&body), SNIPPET_MAX_CHARS);

        warn!(url, status = status.as_u16(), "fetch not ok");

        Outcome::UpstreamError {
            url: url.to_string(),
            fetch: UpstreamDiagnostics {
                status: status.as_u16(),
                status_text: status.canonical_reason().unwrap_or_default().to_string(),
                headers,
                body_snippet,
            },
        }
    }

    fn header_subset(&self, response: &reqwest::Response) -> BTreeMap<String, String> {
        self.diagnostic_headers
            .iter()
            .filter_map(|name| header_value(response, name).map(|v| (name.to_string(), v)))
            .collect()
    }

    fn too_large(&self, url: &str) -> Outcome {
        Outcome::InternalError {
            url: url.to_string(),
            message: format!(
                "Response body exceeds the limit of {} bytes",
                self.max_body_bytes
            ),
        }
    }
}

/// All values of a header joined with ", ", skipping non-text values
fn header_value(response: &reqwest::Response, name: &HeaderName) -> Option<String> {
    let values: Vec<&str> = response
        .headers()
        .get_all(name)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .collect();
    if values.is_empty() {
        None
    } else {
        Some(values.join(", "))
    }
}

/// Check if content type indicates binary content
fn is_binary_content_type(content_type: &str) -> bool {
    let ct_lower = content_type.to_lowercase();
    BINARY_PREFIXES
        .iter()
        .any(|prefix| ct_lower.starts_with(prefix))
}

/// Keep at most `max` characters
fn truncate_chars(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}

/// Read a response body, bounded by a deadline and a byte limit
async fn read_body(
    response: reqwest::Response,
    timeout: Duration,
    max_bytes: usize,
) -> (Bytes, BodyEnd) {
    let mut body = Vec::new();
    let mut stream = response.bytes_stream();
    let deadline = tokio::time::Instant::now() + timeout;

    loop {
        let chunk_future = stream.next();
        let timeout_future = tokio::time::sleep_until(deadline);

        tokio::select! {
            chunk = chunk_future => {
                match chunk {
                    Some(Ok(bytes)) => {
                        body.extend_from_slice(&bytes);
                        if body.len() > max_bytes {
                            body.truncate(max_bytes);
                            return (Bytes::from(body), BodyEnd::LimitReached);
                        }
                    }
                    Some(Err(e)) => {
                        return (Bytes::from(body), BodyEnd::Failed(error_chain(&e)));
                    }
                    None => {
                        // Stream complete
                        return (Bytes::from(body), BodyEnd::Complete);
                    }
                }
            }
            _ = timeout_future => {
                return (Bytes::from(body), BodyEnd::TimedOut);
            }
        }
    }
}
