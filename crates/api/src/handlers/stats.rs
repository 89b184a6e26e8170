//! Aggregate statistics endpoints.

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde::Serialize;

use prospector_db::models::{EnrichmentStats, StoreStats};
use prospector_db::repositories::ContractorRepo;
use prospector_engine::{JobKind, JobStatus};

use crate::error::AppResult;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct StatsResponse {
    #[serde(flatten)]
    pub store: StoreStats,
    pub total_jobs: usize,
    pub active_jobs: usize,
}

#[derive(Debug, Serialize)]
pub struct EnrichmentStatsResponse {
    #[serde(flatten)]
    pub store: EnrichmentStats,
    pub active_enrichment_jobs: usize,
}

/// GET /api/stats
pub async fn get_stats(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let store = ContractorRepo::stats(&state.pool).await?;
    let jobs = state.registry.list(None);
    let active_jobs = jobs
        .iter()
        .filter(|j| j.status == JobStatus::Running)
        .count();

    Ok(Json(StatsResponse {
        store,
        total_jobs: jobs.len(),
        active_jobs,
    }))
}

/// GET /api/stats/enrichment
pub async fn get_enrichment_stats(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let store = ContractorRepo::enrichment_stats(&state.pool).await?;
    let active_enrichment_jobs = state
        .registry
        .list(Some(JobKind::Enrich))
        .iter()
        .filter(|j| j.status == JobStatus::Running)
        .count();

    Ok(Json(EnrichmentStatsResponse {
        store,
        active_enrichment_jobs,
    }))
}
