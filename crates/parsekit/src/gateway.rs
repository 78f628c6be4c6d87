//! Request orchestration
//!
//! Runs the fetch → classify → extract pipeline for one URL or for every URL
//! of a batch, and renders the result according to the response mode.

use crate::classify::{Classified, Classifier};
use crate::config::Config;
use crate::error::{ConfigError, ValidationError};
use crate::extract::{extract_document, Extractor, ReadabilityExtractor};
use crate::fetcher::Fetcher;
use crate::render::{render, Rendered, ResponseMode};
use crate::types::{BatchItemResult, Outcome};
use futures::stream::{self, StreamExt};
use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

/// Fetch-and-extract gateway
///
/// Holds only immutable state, so one instance is shared by all requests.
pub struct Gateway {
    fetcher: Fetcher,
    classifier: Classifier,
    extractor: Arc<dyn Extractor>,
    mode: ResponseMode,
    batch_concurrency: usize,
}

impl Gateway {
    /// Create a gateway using the built-in [`ReadabilityExtractor`]
    pub fn new(config: &Config) -> Result<Self, ConfigError> {
        Self::with_extractor(config, Arc::new(ReadabilityExtractor::new()))
    }

    /// Create a gateway with a custom extractor
    pub fn with_extractor(
        config: &Config,
        extractor: Arc<dyn Extractor>,
    ) -> Result<Self, ConfigError> {
        Ok(Self {
            fetcher: Fetcher::new(config)?,
            classifier: Classifier::new(config),
            extractor,
            mode: config.response_mode,
            batch_concurrency: config.batch_concurrency.max(1),
        })
    }

    pub fn response_mode(&self) -> ResponseMode {
        self.mode
    }

    /// Run the pipeline for one URL
    pub async fn run(&self, url: &str) -> Outcome {
        let raw = self.fetcher.fetch(url).await;
        match self.classifier.classify(url, raw).await {
            Classified::Document(doc) => extract_document(Arc::clone(&self.extractor), doc).await,
            Classified::Done(outcome) => outcome,
        }
    }

    /// Handle a single-URL request
    ///
    /// A missing or blank URL is rejected before any fetch.
    pub async fn parse(&self, url: Option<&str>) -> Result<Rendered, ValidationError> {
        let url = url
            .map(str::trim)
            .filter(|u| !u.is_empty())
            .ok_or(ValidationError::MissingUrl)?;

        let start = Instant::now();
        let outcome = self.run(url).await;
        info!(
            url,
            outcome = outcome.kind(),
            ms = start.elapsed().as_millis() as u64,
            "parse finished"
        );

        Ok(render(&outcome, self.mode))
    }

    /// Handle a batch request of the form `{"urls": [...]}`
    ///
    /// Items run concurrently (bounded) and never affect each other. Results
    /// keep the order of the input list.
    pub async fn parse_batch(&self, payload: &Value) -> Result<Vec<BatchItemResult>, ValidationError> {
        let urls = payload
            .get("urls")
            .and_then(Value::as_array)
            .ok_or(ValidationError::InvalidBatch)?;

        let start = Instant::now();
        info!(
            count = urls.len(),
            concurrency = self.batch_concurrency,
            "batch start"
        );

        // Owned entries keep the handler future independent of the payload borrow
        let results: Vec<BatchItemResult> = stream::iter(urls.iter().cloned())
            .map(|entry| async move { self.run_batch_item(&entry).await })
            .buffered(self.batch_concurrency)
            .collect()
            .await;

        info!(
            count = results.len(),
            succeeded = results.iter().filter(|r| r.success).count(),
            ms = start.elapsed().as_millis() as u64,
            "batch finished"
        );

        Ok(results)
    }

    async fn run_batch_item(&self, entry: &Value) -> BatchItemResult {
        match entry.as_str() {
            Some(url) if !url.trim().is_empty() => {
                let mut item = BatchItemResult::from(self.run(url).await);
                item.url = url.to_string();
                item
            }
            Some(url) => BatchItemResult::failure(url, ValidationError::MissingUrl.to_string()),
            None => BatchItemResult::failure(entry.to_string(), "URL must be a string"),
        }
    }
}
