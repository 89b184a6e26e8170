//! Handlers for browsing stored contractor records.

use axum::extract::{Query, State};
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;

use prospector_db::models::ContractorFilter;
use prospector_db::repositories::ContractorRepo;

use crate::error::AppResult;
use crate::state::AppState;

// Query structs keep every field top-level: `serde(flatten)` does not
// survive urlencoded deserialization for non-string fields.
#[derive(Debug, Deserialize)]
pub struct ListQuery {
    #[serde(default = "default_page")]
    pub page: i64,
    #[serde(default = "default_per_page")]
    pub per_page: i64,
    pub category: Option<String>,
    pub state: Option<String>,
    pub city: Option<String>,
    pub location: Option<String>,
    pub search: Option<String>,
}

fn default_page() -> i64 {
    1
}

fn default_per_page() -> i64 {
    50
}

impl ListQuery {
    fn filter(&self) -> ContractorFilter {
        ContractorFilter {
            category: self.category.clone(),
            state: self.state.clone(),
            city: self.city.clone(),
            location: self.location.clone(),
            search: self.search.clone(),
        }
    }
}

/// GET /api/contractors
///
/// Paginated listing with category/state/city/location/search filters.
pub async fn list_contractors(
    State(state): State<AppState>,
    Query(params): Query<ListQuery>,
) -> AppResult<impl IntoResponse> {
    let page =
        ContractorRepo::list(&state.pool, &params.filter(), params.page, params.per_page).await?;
    Ok(Json(page))
}
