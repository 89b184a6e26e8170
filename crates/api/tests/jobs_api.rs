//! Integration tests for the jobs API: creation, validation, polling,
//! cancellation, and the end-to-end enrichment scenario.

mod common;

use axum::http::StatusCode;
use serde_json::json;

use common::{record, request_json, test_app, wait_terminal};
use prospector_db::repositories::ContractorRepo;

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

#[tokio::test]
async fn scrape_job_requires_categories() {
    let (app, _pool) = test_app().await;

    let (status, body) = request_json(
        &app,
        "POST",
        "/api/jobs",
        Some(json!({
            "kind": "scrape",
            "location": "Martinsburg, WV",
            "categories": [],
        })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn scrape_job_rejects_unknown_category() {
    let (app, _pool) = test_app().await;

    let (status, _body) = request_json(
        &app,
        "POST",
        "/api/jobs",
        Some(json!({
            "kind": "scrape",
            "location": "Martinsburg, WV",
            "categories": ["blacksmith"],
        })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn scrape_job_requires_location() {
    let (app, _pool) = test_app().await;

    let (status, _body) = request_json(
        &app,
        "POST",
        "/api/jobs",
        Some(json!({
            "kind": "scrape",
            "location": "  ",
            "categories": ["plumber"],
        })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

// ---------------------------------------------------------------------------
// Lifecycle
// ---------------------------------------------------------------------------

#[tokio::test]
async fn create_returns_pending_snapshot_immediately() {
    let (app, _pool) = test_app().await;

    let (status, body) = request_json(
        &app,
        "POST",
        "/api/jobs",
        Some(json!({ "kind": "enrich" })),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["kind"], "enrich");
    assert!(body["id"].as_i64().is_some());
    // Creation never waits for execution; the snapshot is pre-terminal
    // or the job already finished on an empty store.
    assert!(body["status"].is_string());
}

#[tokio::test]
async fn enrich_job_end_to_end_with_partial_failures() {
    let (app, pool) = test_app().await;

    // 10 incomplete records; the mock extractor fails for two of them.
    for i in 0..8 {
        ContractorRepo::insert(&pool, &record(&format!("Business {i}")))
            .await
            .expect("seed");
    }
    ContractorRepo::insert(&pool, &record("Fail One")).await.expect("seed");
    ContractorRepo::insert(&pool, &record("Fail Two")).await.expect("seed");

    let (status, body) = request_json(
        &app,
        "POST",
        "/api/jobs",
        Some(json!({ "kind": "enrich", "concurrency": 3 })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let job_id = body["id"].as_i64().expect("job id");

    let done = wait_terminal(&app, job_id).await;
    assert_eq!(done["status"], "completed");
    assert_eq!(done["total_units"], 10);
    assert_eq!(done["processed"], 10);
    assert_eq!(done["succeeded"], 8);
    assert_eq!(done["failed"], 2);

    // Successful units persisted owner data.
    let (_, page) = request_json(&app, "GET", "/api/contractors?search=Business+0", None).await;
    assert_eq!(page["items"][0]["owner_name"], "Jane Doe");
    assert_eq!(page["items"][0]["enriched"], true);
}

#[tokio::test]
async fn scrape_job_stores_extracted_records() {
    let (app, _pool) = test_app().await;

    let (status, body) = request_json(
        &app,
        "POST",
        "/api/jobs",
        Some(json!({
            "kind": "scrape",
            "location": "Martinsburg, WV",
            "categories": ["plumber", "roofer"],
            "concurrency": 2,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let job_id = body["id"].as_i64().expect("job id");

    let done = wait_terminal(&app, job_id).await;
    assert_eq!(done["status"], "completed");
    assert_eq!(done["total_units"], 2);
    assert_eq!(done["processed"], 2);

    // One record per category (the mock yields one deduped candidate).
    let (_, page) = request_json(&app, "GET", "/api/contractors", None).await;
    assert_eq!(page["total"], 2);
}

// ---------------------------------------------------------------------------
// Snapshots & listing
// ---------------------------------------------------------------------------

#[tokio::test]
async fn get_unknown_job_is_404() {
    let (app, _pool) = test_app().await;
    let (status, body) = request_json(&app, "GET", "/api/jobs/999", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "NOT_FOUND");
}

#[tokio::test]
async fn list_jobs_filters_by_kind() {
    let (app, _pool) = test_app().await;

    let (_, enrich) = request_json(&app, "POST", "/api/jobs", Some(json!({ "kind": "enrich" }))).await;
    let (_, cleanup) = request_json(&app, "POST", "/api/jobs", Some(json!({ "kind": "cleanup" }))).await;
    wait_terminal(&app, enrich["id"].as_i64().expect("id")).await;
    wait_terminal(&app, cleanup["id"].as_i64().expect("id")).await;

    let (status, body) = request_json(&app, "GET", "/api/jobs?kind=enrich", None).await;
    assert_eq!(status, StatusCode::OK);
    let jobs = body.as_array().expect("array");
    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0]["kind"], "enrich");

    let (status, _) = request_json(&app, "GET", "/api/jobs?kind=bake", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

// ---------------------------------------------------------------------------
// Cancellation
// ---------------------------------------------------------------------------

#[tokio::test]
async fn cancel_unknown_job_is_404() {
    let (app, _pool) = test_app().await;
    let (status, _) = request_json(&app, "DELETE", "/api/jobs/999", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn cancel_after_completion_returns_same_terminal_snapshot() {
    let (app, _pool) = test_app().await;

    let (_, body) = request_json(&app, "POST", "/api/jobs", Some(json!({ "kind": "enrich" }))).await;
    let job_id = body["id"].as_i64().expect("id");
    let done = wait_terminal(&app, job_id).await;

    let (status, first) = request_json(&app, "DELETE", &format!("/api/jobs/{job_id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    let (_, second) = request_json(&app, "DELETE", &format!("/api/jobs/{job_id}"), None).await;

    assert_eq!(first["status"], done["status"]);
    assert_eq!(first["completed_at"], done["completed_at"]);
    assert_eq!(second["completed_at"], done["completed_at"]);
}
