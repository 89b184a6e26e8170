//! Aggregate statistics DTOs for the dashboard endpoints.

use serde::Serialize;

/// Store-wide counts returned by `GET /api/stats`.
#[derive(Debug, Serialize)]
pub struct StoreStats {
    pub total_contractors: i64,
    pub with_owner: i64,
    pub with_phone: i64,
    pub with_email: i64,
    pub categories_breakdown: Vec<CategoryCount>,
}

#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct CategoryCount {
    pub category: String,
    pub count: i64,
}

/// Enrichment-specific counts returned by `GET /api/stats/enrichment`.
#[derive(Debug, Serialize)]
pub struct EnrichmentStats {
    pub total_enriched: i64,
    pub with_linkedin: i64,
    pub needs_enrichment: i64,
    pub avg_confidence: f64,
}

/// Distinct states and cities present in the store.
#[derive(Debug, Serialize)]
pub struct StoreLocations {
    pub states: Vec<String>,
    pub cities: Vec<CityState>,
}

#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct CityState {
    pub city: String,
    pub state: String,
}
