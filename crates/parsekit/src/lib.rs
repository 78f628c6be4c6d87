//! ParseKit - article extraction gateway
//!
//! Fetches a web page under a strict deadline, extracts a readable article
//! from it and reports the result over HTTP, one URL at a time or in batches.
//!
//! ## Pipeline
//!
//! 1. [`Fetcher`] - bounded-time GET with a fixed browser identity
//! 2. [`Classifier`] - turns timeouts, network failures and non-2xx
//!    responses into an [`Outcome`], or forwards the document
//! 3. [`extract_document`] - runs an [`Extractor`] over the fetched HTML
//! 4. [`render`] - maps the outcome to an HTTP status and JSON body for the
//!    configured [`ResponseMode`]
//!
//! [`Gateway`] wires the stages together and [`server::router`] exposes them
//! over HTTP.

mod classify;
pub mod config;
mod error;
mod extract;
mod fetcher;
mod gateway;
mod render;
pub mod server;
mod types;

pub use classify::{Classified, Classifier, FetchedDocument, SNIPPET_MAX_CHARS};
pub use config::Config;
pub use error::{ConfigError, ExtractError, ValidationError};
pub use extract::{extract_document, Extractor, ReadabilityExtractor};
pub use fetcher::{Fetcher, RawFetchOutcome};
pub use gateway::Gateway;
pub use render::{render, upstream_hint, Rendered, ResponseMode};
pub use types::{
    BatchItemResult, BatchResponse, ExtractedArticle, Outcome, UpstreamDiagnostics,
    TIMEOUT_MESSAGE,
};

use schemars::schema_for;

/// Outbound User-Agent: a common desktop browser, to avoid naive bot blocks
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120 Safari/537.36";

/// Outbound Accept header, HTML first
pub const DEFAULT_ACCEPT: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8";

/// Outbound Accept-Language header
pub const DEFAULT_ACCEPT_LANGUAGE: &str = "en-US,en;q=0.9";

/// JSON schemas of the response payloads
///
/// Keys: `article` (the `result` of a single parse, `data` of a batch item)
/// and `batch` (the body of `POST /parse`).
pub fn response_schemas() -> serde_json::Value {
    serde_json::json!({
        "article": schema_for!(ExtractedArticle),
        "batch": schema_for!(BatchResponse),
    })
}

/// API documentation printed by `parsekit --llmtxt`
pub const API_LLMTXT: &str = r#"# ParseKit API

Fetches a web page and extracts a readable article (title, content, author,
publication date, lead image, excerpt).

## Endpoints

### GET /health
`{"ok": true, "time": "<ISO-8601>"}`

### GET /parse?url=<URL>
Single URL. Success: `{"ok": true, "url": ..., "result": {article}}`.
Failures: `{"ok": false, "url": ..., "error": ...}`, or for non-2xx targets
`{"ok": false, "url": ..., "fetch": {"status", "statusText", "headers", "bodySnippet"}, "hint": ...}`.
Missing url: 400 `{"error": "Parameter ?url= required"}`.

### POST /parse
Body `{"urls": ["https://...", ...]}` (content-type application/json).
Response `{"results": [{"url", "success", "data"?, "error"?}, ...]}` in input
order, status 200. Malformed body: 400 `{"error": ...}`.

## Response modes
- Lenient (default): every failure is HTTP 200 with `ok: false`.
- Strict (`STRICT_HTTP=1`): upstream error 502, timeout 504, other failures 500.

## Configuration
`PORT` (3000), `HOST` (0.0.0.0), `FETCH_TIMEOUT_MS` (30000),
`BODY_TIMEOUT_MS` (30000), `MAX_BODY_BYTES` (10485760), `MAX_REDIRECTS` (10),
`BATCH_CONCURRENCY` (8), `STRICT_HTTP`, `DIAGNOSTIC_HEADERS` (comma list).
"#;
