//! Web search capability.
//!
//! Given a query, returns raw candidate results. The production
//! implementation talks to the Tavily search API.

use async_trait::async_trait;
use serde::Deserialize;

/// One search result.
#[derive(Debug, Clone, Deserialize)]
pub struct SearchHit {
    #[serde(default)]
    pub title: String,
    pub url: String,
    #[serde(default)]
    pub content: String,
}

/// Opaque web-search capability.
#[async_trait]
pub trait SearchClient: Send + Sync {
    async fn search(&self, query: &str, max_results: usize) -> anyhow::Result<Vec<SearchHit>>;
}

// ---------------------------------------------------------------------------
// Tavily implementation
// ---------------------------------------------------------------------------

const TAVILY_ENDPOINT: &str = "https://api.tavily.com/search";

/// Search client backed by the Tavily API.
pub struct TavilySearch {
    http: reqwest::Client,
    api_key: String,
}

#[derive(Debug, Deserialize)]
struct TavilyResponse {
    #[serde(default)]
    results: Vec<SearchHit>,
}

impl TavilySearch {
    /// Build a client. An empty API key is accepted at construction so
    /// the server can boot without one; every search then fails and is
    /// absorbed as a per-unit error.
    pub fn new(api_key: String) -> Self {
        if api_key.is_empty() {
            tracing::warn!("TAVILY_API_KEY not set; search-backed jobs will fail per unit");
        }
        Self {
            http: reqwest::Client::new(),
            api_key,
        }
    }
}

#[async_trait]
impl SearchClient for TavilySearch {
    async fn search(&self, query: &str, max_results: usize) -> anyhow::Result<Vec<SearchHit>> {
        if self.api_key.is_empty() {
            anyhow::bail!("search unavailable: TAVILY_API_KEY not configured");
        }

        let response = self
            .http
            .post(TAVILY_ENDPOINT)
            .json(&serde_json::json!({
                "api_key": self.api_key,
                "query": query,
                "search_depth": "advanced",
                "max_results": max_results,
            }))
            .send()
            .await?
            .error_for_status()?;

        let body: TavilyResponse = response.json().await?;
        Ok(body.results)
    }
}
