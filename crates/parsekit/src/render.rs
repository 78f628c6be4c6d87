//! Status and body mapping for pipeline outcomes
//!
//! Strict mode keeps conventional REST status codes. Lenient mode answers
//! every well-formed request with 200 and reports failures through `ok:false`,
//! so automation callers only ever need to inspect the body.

use crate::types::{Outcome, TIMEOUT_MESSAGE};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::{json, Value};

/// Status mapping policy, fixed at startup
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ResponseMode {
    /// Failures map to non-2xx status codes
    Strict,
    /// Failures map to 200 with `ok:false`
    #[default]
    Lenient,
}

impl ResponseMode {
    /// Interpret the `STRICT_HTTP` toggle: only `"1"` selects strict mode
    pub fn from_strict_flag(value: Option<&str>) -> Self {
        match value {
            Some("1") => ResponseMode::Strict,
            _ => ResponseMode::Lenient,
        }
    }
}

impl std::fmt::Display for ResponseMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResponseMode::Strict => write!(f, "strict"),
            ResponseMode::Lenient => write!(f, "lenient"),
        }
    }
}

/// Final HTTP status and JSON body for one outcome
#[derive(Debug, Clone, PartialEq)]
pub struct Rendered {
    pub status: StatusCode,
    pub body: Value,
}

impl Rendered {
    /// Value of the body's `ok` field
    pub fn is_ok(&self) -> bool {
        self.body["ok"].as_bool().unwrap_or(false)
    }
}

impl IntoResponse for Rendered {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

/// Map an outcome to status and body under the given mode
pub fn render(outcome: &Outcome, mode: ResponseMode) -> Rendered {
    let (strict_status, body) = match outcome {
        Outcome::Success { url, article } => (
            StatusCode::OK,
            json!({ "ok": true, "url": url, "result": article }),
        ),
        Outcome::UpstreamError { url, fetch } => (
            StatusCode::BAD_GATEWAY,
            json!({
                "ok": false,
                "url": url,
                "fetch": fetch,
                "hint": upstream_hint(fetch.status),
            }),
        ),
        Outcome::Timeout { url } => (
            StatusCode::GATEWAY_TIMEOUT,
            json!({ "ok": false, "url": url, "error": TIMEOUT_MESSAGE }),
        ),
        Outcome::ExtractionError { url, message } | Outcome::InternalError { url, message } => (
            StatusCode::INTERNAL_SERVER_ERROR,
            json!({ "ok": false, "url": url, "error": message }),
        ),
    };

    let status = match mode {
        ResponseMode::Strict => strict_status,
        ResponseMode::Lenient => StatusCode::OK,
    };

    Rendered { status, body }
}

/// Explain a non-2xx upstream status to the caller
pub fn upstream_hint(status: u16) -> &'static str {
    match status {
        401 | 403 => "The target site refused the request. It may be blocking automated clients (anti-bot protection, login wall or geo restriction).",
        404 | 410 => "The target page was not found. Check that the URL is correct and still published.",
        429 => "The target site is rate limiting requests. Retry later or reduce request frequency.",
        500..=599 => "The target server failed to respond correctly. The problem is on the upstream side; retrying later may help.",
        _ => "The target responded with a non-success status. See fetch.headers and fetch.bodySnippet for details.",
    }
}
