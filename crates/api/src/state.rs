use std::sync::Arc;

use crate::clients::{LeadExtractor, SearchClient};
use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via
/// `State<AppState>`.
///
/// Cheaply cloneable: every field is behind an `Arc` or already `Clone`.
#[derive(Clone)]
pub struct AppState {
    /// Contractor record store.
    pub pool: prospector_db::DbPool,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Process-wide job registry (owns the event bus).
    pub registry: Arc<prospector_engine::JobRegistry>,
    /// Web search capability used by scrape and enrich units.
    pub search: Arc<dyn SearchClient>,
    /// AI extraction capability used by scrape and enrich units.
    pub extractor: Arc<dyn LeadExtractor>,
}
