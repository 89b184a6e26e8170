//! Store maintenance: duplicate cleanup and location-based pruning.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use serde_json::json;

use prospector_db::repositories::ContractorRepo;
use prospector_engine::{JobKind, DEFAULT_CONCURRENCY};

use crate::error::{AppError, AppResult};
use crate::jobs::DuplicateCleanupSource;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct LocationCleanupRequest {
    /// States to keep; every record outside them is deleted.
    pub keep_states: Vec<String>,
}

/// POST /api/maintenance/cleanup-duplicates
///
/// Runs as a background `cleanup` job (one unit per duplicate group) so
/// large stores report progress instead of blocking the request.
pub async fn cleanup_duplicates(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let id = state.registry.create(
        JobKind::Cleanup,
        "duplicate cleanup",
        DEFAULT_CONCURRENCY,
        Box::new(DuplicateCleanupSource {
            pool: state.pool.clone(),
        }),
    );
    let snapshot = state
        .registry
        .get(id)
        .ok_or(AppError::InternalError("job vanished after creation".into()))?;
    Ok((StatusCode::CREATED, Json(snapshot)))
}

/// POST /api/maintenance/cleanup-locations
///
/// Synchronous: deletes every record whose state is outside the
/// keep-set. An empty keep-set is rejected with 400.
pub async fn cleanup_locations(
    State(state): State<AppState>,
    Json(request): Json<LocationCleanupRequest>,
) -> AppResult<impl IntoResponse> {
    let removed =
        ContractorRepo::cleanup_by_kept_locations(&state.pool, &request.keep_states).await?;
    Ok(Json(json!({
        "removed": removed,
        "message": format!("Removed {removed} contractors"),
    })))
}
