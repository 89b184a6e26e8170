//! Shared test harness: in-memory store, fresh registry, mock
//! capability clients, and the production router.

use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use tower::ServiceExt;

use prospector_api::clients::{ExtractionContext, LeadExtractor, SearchClient, SearchHit};
use prospector_api::config::ServerConfig;
use prospector_api::router::build_app_router;
use prospector_api::state::AppState;
use prospector_core::contact::ExtractedContact;
use prospector_db::models::NewContractor;
use prospector_db::DbPool;
use prospector_engine::{EventBus, JobRegistry};

/// Search stub: every query returns one canned hit.
pub struct MockSearch;

#[async_trait]
impl SearchClient for MockSearch {
    async fn search(&self, query: &str, _max_results: usize) -> anyhow::Result<Vec<SearchHit>> {
        Ok(vec![SearchHit {
            title: format!("Results for {query}"),
            url: "https://example.com/business".to_string(),
            content: "About us: the owner is Jane Doe, jane@example.com".to_string(),
        }])
    }
}

/// Extraction stub.
///
/// - `extract_contact` fails for businesses whose name starts with
///   `Fail`, otherwise returns a fixed owner/email pair.
/// - `extract_record` derives a deterministic record from the page URL.
pub struct MockExtractor;

#[async_trait]
impl LeadExtractor for MockExtractor {
    async fn extract_contact(
        &self,
        context: &ExtractionContext,
        _search_text: &str,
        source_urls: &[String],
    ) -> anyhow::Result<ExtractedContact> {
        if context.business_name.starts_with("Fail") {
            anyhow::bail!("extraction failed for {}", context.business_name);
        }
        Ok(ExtractedContact {
            owner_name: Some("Jane Doe".to_string()),
            email: Some("jane@example.com".to_string()),
            linkedin_url: None,
            confidence: 0.9,
            source_urls: source_urls.to_vec(),
        }
        .sanitized())
    }

    async fn extract_record(
        &self,
        category: &str,
        location: &str,
        page_url: &str,
        _page_text: &str,
    ) -> anyhow::Result<Option<NewContractor>> {
        Ok(Some(NewContractor {
            name: format!("{category} business"),
            owner_name: None,
            category: category.to_string(),
            address: None,
            city: None,
            state: Some("WV".to_string()),
            zip_code: None,
            phone: None,
            email: None,
            website: Some(page_url.to_string()),
            linkedin_url: None,
            source: Some("scraper".to_string()),
            location_searched: Some(location.to_string()),
        }))
    }
}

/// Build the production router over an in-memory database and mock
/// clients. Returns the router and the pool for direct seeding.
pub async fn test_app() -> (Router, DbPool) {
    let pool = prospector_db::memory_pool().await.expect("in-memory pool");
    let registry = Arc::new(JobRegistry::new(Arc::new(EventBus::default())));

    let config = ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        database_url: "sqlite::memory:".to_string(),
    };

    let state = AppState {
        pool: pool.clone(),
        config: Arc::new(config.clone()),
        registry,
        search: Arc::new(MockSearch),
        extractor: Arc::new(MockExtractor),
    };

    (build_app_router(state, &config), pool)
}

/// Seed one minimal contractor record.
pub fn record(name: &str) -> NewContractor {
    NewContractor {
        name: name.to_string(),
        owner_name: None,
        category: "plumber".to_string(),
        address: None,
        city: None,
        state: Some("WV".to_string()),
        zip_code: None,
        phone: None,
        email: None,
        website: None,
        linkedin_url: None,
        source: Some("test".to_string()),
        location_searched: Some("Martinsburg, WV".to_string()),
    }
}

/// Issue one request against the router and return status + JSON body.
pub async fn request_json(
    app: &Router,
    method: &str,
    uri: &str,
    body: Option<serde_json::Value>,
) -> (StatusCode, serde_json::Value) {
    let request = match body {
        Some(json) => Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(json.to_string()))
            .expect("request"),
        None => Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .expect("request"),
    };

    let response = app.clone().oneshot(request).await.expect("response");
    let status = response.status();
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("body")
        .to_bytes();
    let json = if bytes.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null)
    };
    (status, json)
}

/// Poll a job until its snapshot reports a terminal status.
pub async fn wait_terminal(app: &Router, job_id: i64) -> serde_json::Value {
    tokio::time::timeout(std::time::Duration::from_secs(5), async {
        loop {
            let (status, body) = request_json(app, "GET", &format!("/api/jobs/{job_id}"), None).await;
            assert_eq!(status, StatusCode::OK);
            let job_status = body["status"].as_str().expect("status field").to_string();
            if matches!(job_status.as_str(), "completed" | "failed" | "cancelled") {
                return body;
            }
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("job reached a terminal state")
}
