//! The `/api` route tree.
//!
//! ```text
//! /health                              liveness probe
//!
//! /jobs                                create (POST), list (GET)
//! /jobs/{id}                           snapshot (GET), cancel (DELETE)
//! /jobs/{id}/events                    live event stream (WebSocket)
//!
//! /contractors                         paginated listing
//! /import                              CSV import (POST)
//! /export                              CSV export (GET)
//!
//! /maintenance/cleanup-duplicates      duplicate cleanup job (POST)
//! /maintenance/cleanup-locations       keep-set location prune (POST)
//!
//! /locations                           distinct states/cities in store
//! /config/locations                    seed search locations
//! /config/categories                   category table
//!
//! /stats                               store + job counts
//! /stats/enrichment                    enrichment counts
//! ```

use axum::routing::{get, post};
use axum::Router;

use crate::handlers;
use crate::state::AppState;
use crate::ws;

/// Build the `/api` route tree.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(handlers::health::health_check))
        // Jobs
        .route(
            "/jobs",
            post(handlers::jobs::create_job).get(handlers::jobs::list_jobs),
        )
        .route(
            "/jobs/{id}",
            get(handlers::jobs::get_job).delete(handlers::jobs::cancel_job),
        )
        .route("/jobs/{id}/events", get(ws::job_events))
        // Records
        .route("/contractors", get(handlers::contractors::list_contractors))
        .route("/import", post(handlers::imports::import_contractors))
        .route("/export", get(handlers::export::export_contractors))
        // Maintenance
        .route(
            "/maintenance/cleanup-duplicates",
            post(handlers::maintenance::cleanup_duplicates),
        )
        .route(
            "/maintenance/cleanup-locations",
            post(handlers::maintenance::cleanup_locations),
        )
        // Catalog
        .route("/locations", get(handlers::catalog::list_store_locations))
        .route("/config/locations", get(handlers::catalog::list_default_locations))
        .route("/config/categories", get(handlers::catalog::list_categories))
        // Stats
        .route("/stats", get(handlers::stats::get_stats))
        .route("/stats/enrichment", get(handlers::stats::get_enrichment_stats))
}
