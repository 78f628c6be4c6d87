//! Article extraction
//!
//! Design: the gateway never lets an extractor touch the network. It hands
//! over HTML that was already fetched under the deadline, and the extractor
//! turns it into an [`ExtractedArticle`]. [`ReadabilityExtractor`] is the
//! built-in implementation; any other implementation of [`Extractor`] can be
//! plugged into the [`Gateway`](crate::Gateway).

mod readability;

pub use readability::ReadabilityExtractor;

use crate::classify::FetchedDocument;
use crate::error::ExtractError;
use crate::types::{ExtractedArticle, Outcome};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};
use url::Url;

/// Trait for HTML-to-article extractors
///
/// Implementations are synchronous and CPU bound; the adapter runs them on
/// the blocking thread pool.
pub trait Extractor: Send + Sync {
    /// Unique identifier for this extractor (for logging/debugging)
    fn name(&self) -> &'static str;

    /// Extract an article from pre-fetched HTML
    ///
    /// `url` is the document URL after redirects and is used to resolve
    /// relative links.
    fn extract(&self, url: &Url, html: &str) -> Result<ExtractedArticle, ExtractError>;
}

/// Run an extractor over a fetched document and normalize the result
///
/// Extraction failures, including a panic inside the extractor, become
/// [`Outcome::ExtractionError`].
pub async fn extract_document(extractor: Arc<dyn Extractor>, doc: FetchedDocument) -> Outcome {
    let FetchedDocument {
        url,
        final_url,
        html,
        ..
    } = doc;

    let base = match Url::parse(&final_url).or_else(|_| Url::parse(&url)) {
        Ok(base) => base,
        Err(e) => {
            return Outcome::ExtractionError {
                url,
                message: format!("Invalid document URL: {e}"),
            }
        }
    };

    let start = Instant::now();
    debug!(
        url = %url,
        extractor = extractor.name(),
        html_length = html.len(),
        "parsing start"
    );

    let result = tokio::task::spawn_blocking(move || extractor.extract(&base, &html)).await;
    let ms = start.elapsed().as_millis() as u64;

    match result {
        Ok(Ok(article)) => {
            info!(
                url = %url,
                ms,
                title = article.title.as_deref().unwrap_or_default(),
                content_length = article.content.as_ref().map_or(0, String::len),
                "parsing success"
            );
            Outcome::Success { url, article }
        }
        Ok(Err(err)) => {
            warn!(url = %url, ms, error = %err, "parsing failed");
            Outcome::ExtractionError {
                url,
                message: err.to_string(),
            }
        }
        Err(join_err) => {
            warn!(url = %url, ms, error = %join_err, "extractor task failed");
            Outcome::ExtractionError {
                url,
                message: ExtractError::Extractor(join_err.to_string()).to_string(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct PanickingExtractor;

    impl Extractor for PanickingExtractor {
        fn name(&self) -> &'static str {
            "panicking"
        }

        fn extract(&self, _url: &Url, _html: &str) -> Result<ExtractedArticle, ExtractError> {
            panic!("extractor bug")
        }
    }

    struct FailingExtractor;

    impl Extractor for FailingExtractor {
        fn name(&self) -> &'static str {
            "failing"
        }

        fn extract(&self, _url: &Url, _html: &str) -> Result<ExtractedArticle, ExtractError> {
            Err(ExtractError::NoContent)
        }
    }

    fn document(html: &str) -> FetchedDocument {
        FetchedDocument {
            url: "https://example.com/start".to_string(),
            final_url: "https://example.com/final".to_string(),
            content_type: Some("text/html".to_string()),
            html: html.to_string(),
        }
    }

    #[tokio::test]
    async fn test_success_keeps_requested_url() {
        let html = "<html><head><title>Hello</title></head><body><p>Some words here.</p></body></html>";
        let outcome = extract_document(Arc::new(ReadabilityExtractor::new()), document(html)).await;

        match outcome {
            Outcome::Success { url, article } => {
                assert_eq!(url, "https://example.com/start");
                assert_eq!(article.url, "https://example.com/final");
                assert_eq!(article.title.as_deref(), Some("Hello"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_extractor_error_is_extraction_error() {
        let outcome = extract_document(Arc::new(FailingExtractor), document("<p>x</p>")).await;
        assert_eq!(
            outcome,
            Outcome::ExtractionError {
                url: "https://example.com/start".to_string(),
                message: "No readable content found in document".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn test_extractor_panic_is_contained() {
        let outcome = extract_document(Arc::new(PanickingExtractor), document("<p>x</p>")).await;
        match outcome {
            Outcome::ExtractionError { message, .. } => {
                assert!(message.starts_with("Extractor error"))
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}
