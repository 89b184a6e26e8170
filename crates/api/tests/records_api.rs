//! Integration tests for record import/export, maintenance, and stats
//! endpoints.

mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::json;
use tower::ServiceExt;

use common::{record, request_json, test_app, wait_terminal};
use prospector_db::repositories::ContractorRepo;

// ---------------------------------------------------------------------------
// Import
// ---------------------------------------------------------------------------

#[tokio::test]
async fn import_merges_duplicates_and_counts_both() {
    let (app, _pool) = test_app().await;

    let (status, body) = request_json(
        &app,
        "POST",
        "/api/import",
        Some(json!({
            "contractors": [
                { "name": "Smith Plumbing", "category": "plumber", "phone": "304-555-0123" },
                { "name": "Smith Plumbing LLC", "category": "plumber", "phone": "(304) 555-0123",
                  "email": "jane@smith.example" },
                { "name": "Valley HVAC", "category": "hvac" },
            ],
        })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["imported"], 2);
    assert_eq!(body["merged"], 1);
    assert_eq!(body["total"], 3);
    assert!(body["enrichment_job_id"].is_null());

    // The merged email landed on the stored row.
    let (_, page) = request_json(&app, "GET", "/api/contractors?search=Smith", None).await;
    assert_eq!(page["total"], 1);
    assert_eq!(page["items"][0]["email"], "jane@smith.example");
}

#[tokio::test]
async fn import_with_enrich_after_starts_follow_on_job() {
    let (app, _pool) = test_app().await;

    let (status, body) = request_json(
        &app,
        "POST",
        "/api/import",
        Some(json!({
            "contractors": [
                { "name": "Acme Roofing", "category": "roofer", "state": "WV" },
            ],
            "enrich_after": true,
        })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let job_id = body["enrichment_job_id"].as_i64().expect("follow-on job id");

    let done = wait_terminal(&app, job_id).await;
    assert_eq!(done["kind"], "enrich");
    assert_eq!(done["total_units"], 1);
    assert_eq!(done["succeeded"], 1);
}

#[tokio::test]
async fn import_rejects_empty_payload() {
    let (app, _pool) = test_app().await;
    let (status, _) = request_json(
        &app,
        "POST",
        "/api/import",
        Some(json!({ "contractors": [] })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

// ---------------------------------------------------------------------------
// Export
// ---------------------------------------------------------------------------

#[tokio::test]
async fn export_uses_fixed_column_order_and_escapes_fields() {
    let (app, pool) = test_app().await;

    ContractorRepo::insert(
        &pool,
        &prospector_db::models::NewContractor {
            owner_name: Some("Jane Doe".to_string()),
            address: Some("12 Oak St, Suite 4".to_string()),
            phone: Some("304-555-0123".to_string()),
            ..record("Smith Plumbing")
        },
    )
    .await
    .expect("seed");

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/export?state=WV")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()["content-type"].to_str().expect("header"),
        "text/csv"
    );
    assert!(response.headers()["content-disposition"]
        .to_str()
        .expect("header")
        .contains("contractors_WV.csv"));

    let bytes = response.into_body().collect().await.expect("body").to_bytes();
    let csv = String::from_utf8(bytes.to_vec()).expect("utf8");
    let mut lines = csv.lines();

    assert_eq!(
        lines.next(),
        Some("Business Name,Owner Name,Category,Phone,Email,Address,City,State,Zip,Website,LinkedIn")
    );
    let row = lines.next().expect("one data row");
    assert!(row.starts_with("Smith Plumbing,Jane Doe,plumber,304-555-0123,"));
    // The comma-bearing address is quoted.
    assert!(row.contains("\"12 Oak St, Suite 4\""));
}

// ---------------------------------------------------------------------------
// Maintenance
// ---------------------------------------------------------------------------

#[tokio::test]
async fn cleanup_locations_rejects_empty_keep_set() {
    let (app, pool) = test_app().await;
    ContractorRepo::insert(&pool, &record("Smith Plumbing")).await.expect("seed");

    let (status, body) = request_json(
        &app,
        "POST",
        "/api/maintenance/cleanup-locations",
        Some(json!({ "keep_states": [] })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");

    // Nothing was deleted.
    let (_, page) = request_json(&app, "GET", "/api/contractors", None).await;
    assert_eq!(page["total"], 1);
}

#[tokio::test]
async fn cleanup_locations_keeps_only_requested_states() {
    let (app, pool) = test_app().await;
    for (name, state) in [("A Plumbing", "WV"), ("B Plumbing", "VA"), ("C Plumbing", "MD")] {
        ContractorRepo::insert(
            &pool,
            &prospector_db::models::NewContractor {
                state: Some(state.to_string()),
                ..record(name)
            },
        )
        .await
        .expect("seed");
    }

    let (status, body) = request_json(
        &app,
        "POST",
        "/api/maintenance/cleanup-locations",
        Some(json!({ "keep_states": ["WV"] })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["removed"], 2);
}

#[tokio::test]
async fn cleanup_duplicates_runs_as_job() {
    let (app, pool) = test_app().await;
    ContractorRepo::insert(&pool, &record("Smith Plumbing")).await.expect("seed");
    ContractorRepo::insert(&pool, &record("Smith Plumbing")).await.expect("seed");

    let (status, body) =
        request_json(&app, "POST", "/api/maintenance/cleanup-duplicates", None).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["kind"], "cleanup");

    let done = wait_terminal(&app, body["id"].as_i64().expect("id")).await;
    assert_eq!(done["status"], "completed");
    assert_eq!(done["total_units"], 1);

    let (_, page) = request_json(&app, "GET", "/api/contractors", None).await;
    assert_eq!(page["total"], 1);
}

// ---------------------------------------------------------------------------
// Stats & catalog
// ---------------------------------------------------------------------------

#[tokio::test]
async fn stats_combine_store_counts_and_job_counts() {
    let (app, pool) = test_app().await;
    ContractorRepo::insert(
        &pool,
        &prospector_db::models::NewContractor {
            owner_name: Some("Jane Doe".to_string()),
            ..record("Smith Plumbing")
        },
    )
    .await
    .expect("seed");

    let (status, body) = request_json(&app, "GET", "/api/stats", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total_contractors"], 1);
    assert_eq!(body["with_owner"], 1);
    assert_eq!(body["total_jobs"], 0);
    assert_eq!(body["active_jobs"], 0);
}

#[tokio::test]
async fn catalog_endpoints_serve_seed_tables() {
    let (app, _pool) = test_app().await;

    let (status, categories) = request_json(&app, "GET", "/api/config/categories", None).await;
    assert_eq!(status, StatusCode::OK);
    let categories = categories.as_array().expect("array");
    assert_eq!(categories.len(), 13);
    assert!(categories.iter().any(|c| c["value"] == "general_contractor"));

    let (status, locations) = request_json(&app, "GET", "/api/config/locations", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(locations.as_array().expect("array").len(), 4);
}

#[tokio::test]
async fn store_locations_reflect_stored_records() {
    let (app, pool) = test_app().await;
    ContractorRepo::insert(
        &pool,
        &prospector_db::models::NewContractor {
            city: Some("Martinsburg".to_string()),
            ..record("Smith Plumbing")
        },
    )
    .await
    .expect("seed");

    let (status, body) = request_json(&app, "GET", "/api/locations", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["states"].as_array().expect("states").len(), 1);
    assert_eq!(body["states"][0], "WV");
    assert_eq!(body["cities"][0]["city"], "Martinsburg");
}
