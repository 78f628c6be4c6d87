//! Bounded-time HTTP retrieval
//!
//! The fetcher sends a GET with a fixed browser identity and waits for the
//! response headers under a deadline. It never reads the body: the
//! [`Classifier`](crate::Classifier) decides how much of it to consume.

use crate::config::Config;
use crate::error::{error_chain, ConfigError};
use crate::{DEFAULT_ACCEPT, DEFAULT_ACCEPT_LANGUAGE, DEFAULT_USER_AGENT};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, USER_AGENT};
use reqwest::redirect::Policy;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};
use url::Url;

/// Raw result of a fetch, consumed once by the classifier
#[derive(Debug)]
pub enum RawFetchOutcome {
    /// Deadline passed before response headers arrived
    Aborted,
    /// Connection, DNS, TLS, redirect or URL failure
    NetworkFailure { message: String },
    /// Any response, whatever its status; body not read yet
    HttpResponse(reqwest::Response),
}

impl RawFetchOutcome {
    /// Classify a reqwest send error
    fn from_reqwest(err: &reqwest::Error) -> Self {
        if err.is_timeout() {
            RawFetchOutcome::Aborted
        } else if err.is_redirect() {
            RawFetchOutcome::NetworkFailure {
                message: format!("Too many redirects: {}", error_chain(err)),
            }
        } else if err.is_connect() {
            RawFetchOutcome::NetworkFailure {
                message: format!("Failed to connect to server: {}", error_chain(err)),
            }
        } else {
            RawFetchOutcome::NetworkFailure {
                message: format!("Request failed: {}", error_chain(err)),
            }
        }
    }
}

/// HTTP fetcher with a per-request deadline
///
/// Holds one pooled client for the lifetime of the process; every call to
/// [`fetch`](Fetcher::fetch) carries its own independent timer.
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: reqwest::Client,
    timeout: Duration,
}

impl Fetcher {
    /// Build a fetcher from the gateway configuration
    pub fn new(config: &Config) -> Result<Self, ConfigError> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(DEFAULT_USER_AGENT));
        headers.insert(ACCEPT, HeaderValue::from_static(DEFAULT_ACCEPT));
        headers.insert(
            ACCEPT_LANGUAGE,
            HeaderValue::from_static(DEFAULT_ACCEPT_LANGUAGE),
        );

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .redirect(Policy::limited(config.max_redirects))
            .build()
            .map_err(ConfigError::ClientBuildError)?;

        Ok(Self {
            client,
            timeout: config.fetch_timeout,
        })
    }

    /// Deadline applied to each fetch
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Fetch a URL, waiting at most the configured timeout for headers
    pub async fn fetch(&self, url: &str) -> RawFetchOutcome {
        let target = match parse_target(url) {
            Ok(target) => target,
            Err(message) => {
                warn!(url, %message, "rejected target URL");
                return RawFetchOutcome::NetworkFailure { message };
            }
        };

        let start = Instant::now();
        debug!(
            url,
            timeout_ms = self.timeout.as_millis() as u64,
            "fetching start"
        );

        // Timeout polls the send future before its timer, so a response that
        // is ready when the deadline fires still wins. Dropping the future on
        // expiry cancels the in-flight request.
        let outcome = match tokio::time::timeout(self.timeout, self.client.get(target).send()).await
        {
            Err(_) => RawFetchOutcome::Aborted,
            Ok(Err(err)) => RawFetchOutcome::from_reqwest(&err),
            Ok(Ok(response)) => RawFetchOutcome::HttpResponse(response),
        };

        let ms = start.elapsed().as_millis() as u64;
        match &outcome {
            RawFetchOutcome::HttpResponse(response) => info!(
                url,
                status = response.status().as_u16(),
                ok = response.status().is_success(),
                ms,
                "fetching done"
            ),
            RawFetchOutcome::Aborted => warn!(url, ms, "fetch aborted: deadline exceeded"),
            RawFetchOutcome::NetworkFailure { message } => {
                warn!(url, ms, %message, "fetch failed")
            }
        }

        outcome
    }
}

/// Validate that the target is an absolute http(s) URL
fn parse_target(url: &str) -> Result<Url, String> {
    let trimmed = url.trim();
    let parsed = Url::parse(trimmed).map_err(|e| format!("Invalid URL {trimmed:?}: {e}"))?;
    match parsed.scheme() {
        "http" | "https" => Ok(parsed),
        _ => Err("Invalid URL: must start with http:// or https://".to_string()),
    }
}
