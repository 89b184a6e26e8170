//! CSV import: merge incoming records into the store and optionally
//! start a follow-on enrichment job over the just-imported rows.

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};

use prospector_core::CoreError;
use prospector_db::models::{EnrichmentTargets, NewContractor};
use prospector_db::repositories::{ContractorRepo, MergeOutcome};
use prospector_engine::{JobId, JobKind, DEFAULT_CONCURRENCY};

use crate::error::AppResult;
use crate::jobs::EnrichSource;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ImportRequest {
    pub contractors: Vec<NewContractor>,
    /// Start an enrichment job over the imported records afterwards.
    #[serde(default)]
    pub enrich_after: bool,
    pub concurrency: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct ImportResponse {
    pub imported: i64,
    pub merged: i64,
    pub total: i64,
    pub enrichment_job_id: Option<JobId>,
}

/// POST /api/import
///
/// Each record goes through the identity-key merge: duplicates update
/// the stored row instead of inserting a second one.
pub async fn import_contractors(
    State(state): State<AppState>,
    Json(request): Json<ImportRequest>,
) -> AppResult<impl IntoResponse> {
    if request.contractors.is_empty() {
        return Err(CoreError::Validation("No records to import".into()).into());
    }

    let mut imported = 0i64;
    let mut merged = 0i64;
    let mut touched_ids = Vec::with_capacity(request.contractors.len());

    for record in &request.contractors {
        if record.name.trim().is_empty() {
            // Rows without a business name are skipped, not fatal.
            continue;
        }
        let incoming = NewContractor {
            source: record.source.clone().or_else(|| Some("csv_import".into())),
            location_searched: record
                .location_searched
                .clone()
                .or_else(|| record.city.clone())
                .or_else(|| Some("CSV Import".into())),
            ..record.clone()
        };
        match ContractorRepo::merge_or_insert(&state.pool, &incoming).await? {
            MergeOutcome::Inserted(id) => {
                imported += 1;
                touched_ids.push(id);
            }
            MergeOutcome::Merged(id) => {
                merged += 1;
                touched_ids.push(id);
            }
        }
    }

    tracing::info!(imported, merged, "CSV import finished");

    // Follow-on enrichment only covers the imported rows that are still
    // missing owner or email data.
    let enrichment_job_id = if request.enrich_after && !touched_ids.is_empty() {
        let id = state.registry.create(
            JobKind::Enrich,
            format!("enrich {} imported records", touched_ids.len()),
            request.concurrency.unwrap_or(DEFAULT_CONCURRENCY),
            Box::new(EnrichSource {
                pool: state.pool.clone(),
                search: state.search.clone(),
                extractor: state.extractor.clone(),
                targets: EnrichmentTargets {
                    ids: Some(touched_ids),
                    ..EnrichmentTargets::default()
                },
            }),
        );
        Some(id)
    } else {
        None
    };

    Ok(Json(ImportResponse {
        imported,
        merged,
        total: imported + merged,
        enrichment_job_id,
    }))
}
