//! Process-wide configuration
//!
//! Read once at startup and passed explicitly into the [`Fetcher`](crate::Fetcher),
//! [`Classifier`](crate::Classifier) and [`Gateway`](crate::Gateway).
//! Request handling never touches the environment.

use crate::error::ConfigError;
use crate::render::ResponseMode;
use reqwest::header::HeaderName;
use std::str::FromStr;
use std::time::Duration;

/// Default listen port
pub const DEFAULT_PORT: u16 = 3000;

/// Default deadline for receiving response headers
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_millis(30_000);

/// Default deadline for reading a response body
pub const DEFAULT_BODY_TIMEOUT: Duration = Duration::from_millis(30_000);

/// Largest 2xx body handed to the extractor
pub const DEFAULT_MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

pub const DEFAULT_MAX_REDIRECTS: usize = 10;

pub const DEFAULT_BATCH_CONCURRENCY: usize = 8;

/// Upstream headers kept in `UpstreamError` diagnostics
///
/// Content type and server, plus the usual CDN/edge identifiers that help
/// tell anti-bot pages, rate limits and geo blocks apart.
pub const DEFAULT_DIAGNOSTIC_HEADERS: &[&str] = &[
    "content-type",
    "server",
    "cache-control",
    "retry-after",
    "via",
    "x-cache",
    "x-served-by",
    "cf-ray",
    "cf-cache-status",
    "cf-mitigated",
    "x-amz-cf-id",
    "x-vercel-id",
    "x-vercel-cache",
    "akamai-grn",
];

/// Immutable gateway configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Bind address
    pub host: String,
    /// Listen port
    pub port: u16,
    /// Deadline for the upstream response headers
    pub fetch_timeout: Duration,
    /// Deadline for reading a response body once headers arrived
    pub body_timeout: Duration,
    /// Maximum size of a 2xx body
    pub max_body_bytes: usize,
    /// Redirect cap; exceeding it is a network failure
    pub max_redirects: usize,
    /// Concurrent pipelines per batch request
    pub batch_concurrency: usize,
    /// Status mapping policy
    pub response_mode: ResponseMode,
    /// Upstream headers captured for failed fetches
    pub diagnostic_headers: Vec<HeaderName>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: DEFAULT_PORT,
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
            body_timeout: DEFAULT_BODY_TIMEOUT,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
            max_redirects: DEFAULT_MAX_REDIRECTS,
            batch_concurrency: DEFAULT_BATCH_CONCURRENCY,
            response_mode: ResponseMode::Lenient,
            diagnostic_headers: DEFAULT_DIAGNOSTIC_HEADERS
                .iter()
                .copied()
                .map(HeaderName::from_static)
                .collect(),
        }
    }
}

impl Config {
    /// Load configuration from process environment variables
    ///
    /// Recognized: `HOST`, `PORT`, `FETCH_TIMEOUT_MS`, `BODY_TIMEOUT_MS`,
    /// `MAX_BODY_BYTES`, `MAX_REDIRECTS`, `BATCH_CONCURRENCY`, `STRICT_HTTP`,
    /// `DIAGNOSTIC_HEADERS`. Unset or blank variables take their defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through a variable lookup function
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let defaults = Self::default();

        let fetch_timeout_ms: u64 = parse_var(
            "FETCH_TIMEOUT_MS",
            get("FETCH_TIMEOUT_MS"),
            defaults.fetch_timeout.as_millis() as u64,
        )?;
        let body_timeout_ms: u64 = parse_var(
            "BODY_TIMEOUT_MS",
            get("BODY_TIMEOUT_MS"),
            defaults.body_timeout.as_millis() as u64,
        )?;
        let batch_concurrency: usize = parse_var(
            "BATCH_CONCURRENCY",
            get("BATCH_CONCURRENCY"),
            defaults.batch_concurrency,
        )?;

        ensure_positive("FETCH_TIMEOUT_MS", fetch_timeout_ms)?;
        ensure_positive("BODY_TIMEOUT_MS", body_timeout_ms)?;
        ensure_positive("BATCH_CONCURRENCY", batch_concurrency as u64)?;

        let diagnostic_headers = match get("DIAGNOSTIC_HEADERS") {
            Some(list) => parse_header_list(&list)?,
            None => defaults.diagnostic_headers,
        };

        Ok(Self {
            host: get("HOST").unwrap_or(defaults.host),
            port: parse_var("PORT", get("PORT"), defaults.port)?,
            fetch_timeout: Duration::from_millis(fetch_timeout_ms),
            body_timeout: Duration::from_millis(body_timeout_ms),
            max_body_bytes: parse_var(
                "MAX_BODY_BYTES",
                get("MAX_BODY_BYTES"),
                defaults.max_body_bytes,
            )?,
            max_redirects: parse_var(
                "MAX_REDIRECTS",
                get("MAX_REDIRECTS"),
                defaults.max_redirects,
            )?,
            batch_concurrency,
            response_mode: ResponseMode::from_strict_flag(get("STRICT_HTTP").as_deref()),
            diagnostic_headers,
        })
    }

    /// Override the response mode
    pub fn with_response_mode(mut self, mode: ResponseMode) -> Self {
        self.response_mode = mode;
        self
    }

    /// Override the fetch deadline
    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }
}

fn parse_var<T: FromStr>(name: &'static str, value: Option<String>, default: T) -> Result<T, ConfigError> {
    match value {
        Some(value) => value
            .parse()
            .map_err(|_| ConfigError::InvalidNumber { name, value }),
        None => Ok(default),
    }
}

fn ensure_positive(name: &'static str, value: u64) -> Result<(), ConfigError> {
    if value == 0 {
        return Err(ConfigError::MustBePositive { name });
    }
    Ok(())
}

fn parse_header_list(list: &str) -> Result<Vec<HeaderName>, ConfigError> {
    list.split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(|name| {
            HeaderName::from_bytes(name.to_ascii_lowercase().as_bytes())
                .map_err(|_| ConfigError::InvalidHeaderName(name.to_string()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name: &str| map.get(name).cloned()
    }

    #[test]
    fn test_defaults_when_unset() {
        let config = Config::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.port, 3000);
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.fetch_timeout, Duration::from_millis(30_000));
        assert_eq!(config.max_redirects, 10);
        assert_eq!(config.response_mode, ResponseMode::Lenient);
        assert!(config
            .diagnostic_headers
            .iter()
            .any(|h| h.as_str() == "cf-ray"));
    }

    #[test]
    fn test_reads_recognized_variables() {
        let config = Config::from_lookup(lookup(&[
            ("PORT", "8080"),
            ("FETCH_TIMEOUT_MS", "1500"),
            ("STRICT_HTTP", "1"),
            ("BATCH_CONCURRENCY", "2"),
            ("DIAGNOSTIC_HEADERS", "Server, X-Request-Id"),
        ]))
        .unwrap();

        assert_eq!(config.port, 8080);
        assert_eq!(config.fetch_timeout, Duration::from_millis(1500));
        assert_eq!(config.response_mode, ResponseMode::Strict);
        assert_eq!(config.batch_concurrency, 2);
        let names: Vec<&str> = config.diagnostic_headers.iter().map(|h| h.as_str()).collect();
        assert_eq!(names, vec!["server", "x-request-id"]);
    }

    #[test]
    fn test_strict_only_for_exact_flag() {
        for value in ["0", "true", "yes", "strict"] {
            let config = Config::from_lookup(lookup(&[("STRICT_HTTP", value)])).unwrap();
            assert_eq!(config.response_mode, ResponseMode::Lenient, "value {value}");
        }
    }

    #[test]
    fn test_blank_values_use_defaults() {
        let config = Config::from_lookup(lookup(&[("PORT", "  "), ("FETCH_TIMEOUT_MS", "")])).unwrap();
        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(config.fetch_timeout, DEFAULT_FETCH_TIMEOUT);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let err = Config::from_lookup(lookup(&[("PORT", "http")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidNumber { name: "PORT", .. }));

        let err = Config::from_lookup(lookup(&[("FETCH_TIMEOUT_MS", "0")])).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::MustBePositive {
                name: "FETCH_TIMEOUT_MS"
            }
        ));

        let err = Config::from_lookup(lookup(&[("DIAGNOSTIC_HEADERS", "bad header")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidHeaderName(_)));
    }
}
