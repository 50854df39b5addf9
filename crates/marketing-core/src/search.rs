//! Web-search collaborator and the rendering of its results for the model.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, instrument};

use crate::{MarketingError, SecretValue, metrics};

pub const DEFAULT_NUM_RESULTS: usize = 5;

const NO_TITLE: &str = "No title";
const NO_LINK: &str = "No link";
const NO_SNIPPET: &str = "No snippet";

/// One normalised search hit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub title: String,
    pub url: String,
    pub snippet: String,
}

#[async_trait]
pub trait SearchClient: Send + Sync {
    async fn search(&self, query: &str, limit: usize)
    -> Result<Vec<SearchResult>, MarketingError>;
}

pub type DynSearchClient = Arc<dyn SearchClient>;

/// Render results as the numbered list handed back to the model.
pub fn render_results(results: &[SearchResult]) -> String {
    if results.is_empty() {
        return "No results found.".to_string();
    }

    results
        .iter()
        .enumerate()
        .map(|(idx, result)| {
            format!(
                "{}. {}\n   URL: {}\n   Snippet: {}\n",
                idx + 1,
                result.title,
                result.url,
                result.snippet
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Serper (google.serper.dev) search client.
pub struct SerperClient {
    http: reqwest::Client,
    endpoint: String,
    api_key: SecretValue,
}

impl SerperClient {
    pub fn new(
        endpoint: impl Into<String>,
        api_key: SecretValue,
        timeout: Duration,
    ) -> Result<Self, MarketingError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| MarketingError::InvalidConfiguration(err.to_string()))?;
        Ok(Self {
            http,
            endpoint: endpoint.into(),
            api_key,
        })
    }

    async fn fetch(&self, query: &str, limit: usize) -> Result<Vec<SearchResult>, MarketingError> {
        let response = self
            .http
            .post(&self.endpoint)
            .header("X-API-KEY", self.api_key.expose())
            .json(&json!({ "q": query, "num": limit }))
            .send()
            .await
            .map_err(|err| MarketingError::search(format!("request failed: {err}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(MarketingError::search(format!(
                "search service returned status {}",
                status.as_u16()
            )));
        }

        let body: SerperResponse = response
            .json()
            .await
            .map_err(|err| MarketingError::search(format!("malformed search body: {err}")))?;

        Ok(body
            .organic
            .into_iter()
            .take(limit)
            .map(SerperHit::normalise)
            .collect())
    }
}

#[async_trait]
impl SearchClient for SerperClient {
    #[instrument(name = "search.serper", skip(self))]
    async fn search(
        &self,
        query: &str,
        limit: usize,
    ) -> Result<Vec<SearchResult>, MarketingError> {
        if limit == 0 {
            return Err(MarketingError::Validation(
                "search limit must be at least 1".into(),
            ));
        }

        let started = Instant::now();
        let result = self.fetch(query, limit).await;
        let elapsed = started.elapsed().as_millis() as u64;
        metrics::record_search(if result.is_ok() { "ok" } else { "error" }, elapsed);

        if let Ok(results) = &result {
            debug!(results = results.len(), elapsed_ms = elapsed, "search completed");
        }
        result
    }
}

#[derive(Deserialize)]
struct SerperResponse {
    #[serde(default)]
    organic: Vec<SerperHit>,
}

#[derive(Deserialize)]
struct SerperHit {
    title: Option<String>,
    link: Option<String>,
    snippet: Option<String>,
}

impl SerperHit {
    fn normalise(self) -> SearchResult {
        SearchResult {
            title: self.title.unwrap_or_else(|| NO_TITLE.to_string()),
            url: self.link.unwrap_or_else(|| NO_LINK.to_string()),
            snippet: self.snippet.unwrap_or_else(|| NO_SNIPPET.to_string()),
        }
    }
}

/// Simple in-memory search client for tests and offline runs.
pub struct StubSearchClient {
    results: Vec<SearchResult>,
    failure: Option<String>,
    queries: AtomicUsize,
}

impl StubSearchClient {
    pub fn new() -> Self {
        Self::with_results(vec![
            SearchResult {
                title: "Industry overview".to_string(),
                url: "https://example.com/industry-overview".to_string(),
                snippet: "Demand continues to grow across core segments.".to_string(),
            },
            SearchResult {
                title: "Trend report".to_string(),
                url: "https://example.com/market-trends".to_string(),
                snippet: "Short-form video dominates discovery for younger audiences."
                    .to_string(),
            },
        ])
    }

    pub fn with_results(results: Vec<SearchResult>) -> Self {
        Self {
            results,
            failure: None,
            queries: AtomicUsize::new(0),
        }
    }

    /// Fail every search as if the upstream service were unavailable.
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            results: Vec::new(),
            failure: Some(message.into()),
            queries: AtomicUsize::new(0),
        }
    }

    pub fn query_count(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }
}

impl Default for StubSearchClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SearchClient for StubSearchClient {
    async fn search(
        &self,
        _query: &str,
        limit: usize,
    ) -> Result<Vec<SearchResult>, MarketingError> {
        if limit == 0 {
            return Err(MarketingError::Validation(
                "search limit must be at least 1".into(),
            ));
        }
        self.queries.fetch_add(1, Ordering::SeqCst);
        if let Some(message) = &self.failure {
            return Err(MarketingError::search(message.clone()));
        }
        Ok(self.results.iter().take(limit).cloned().collect())
    }
}
