//! Static configuration tables and store-derived location listings.

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

use prospector_core::catalog::{ContractorCategory, DEFAULT_LOCATIONS};
use prospector_db::repositories::ContractorRepo;

use crate::error::AppResult;
use crate::state::AppState;

/// GET /api/config/categories
pub async fn list_categories() -> Json<serde_json::Value> {
    let categories: Vec<_> = ContractorCategory::ALL
        .iter()
        .map(|c| json!({ "value": c.as_str(), "label": c.label() }))
        .collect();
    Json(json!(categories))
}

/// GET /api/config/locations
pub async fn list_default_locations() -> Json<serde_json::Value> {
    let locations: Vec<_> = DEFAULT_LOCATIONS
        .iter()
        .map(|loc| {
            json!({
                "id": loc.id,
                "name": loc.name,
                "city": loc.city,
                "state": loc.state,
            })
        })
        .collect();
    Json(json!(locations))
}

/// GET /api/locations
///
/// Distinct states and cities currently present in the store.
pub async fn list_store_locations(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let locations = ContractorRepo::locations(&state.pool).await?;
    Ok(Json(locations))
}
