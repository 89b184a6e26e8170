//! Handlers for the `/jobs` resource.
//!
//! Job creation validates synchronously and returns a `pending`
//! snapshot immediately; execution happens on the job's own task.
//! Status reads and cancellation never block on running work.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;

use prospector_core::catalog::ContractorCategory;
use prospector_core::CoreError;
use prospector_db::models::EnrichmentTargets;
use prospector_engine::{JobId, JobKind, DEFAULT_CONCURRENCY};

use crate::error::{AppError, AppResult};
use crate::jobs::{DuplicateCleanupSource, EnrichSource, ScrapeSource};
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

/// POST /api/jobs body. The `kind` tag selects the job type.
#[derive(Debug, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum CreateJobRequest {
    Scrape {
        location: String,
        categories: Vec<String>,
        concurrency: Option<usize>,
    },
    Enrich {
        #[serde(flatten)]
        targets: EnrichmentTargets,
        concurrency: Option<usize>,
    },
    Cleanup {
        concurrency: Option<usize>,
    },
}

#[derive(Debug, Deserialize)]
pub struct JobListQuery {
    /// Filter by job kind (`scrape`, `enrich`, `cleanup`).
    pub kind: Option<String>,
}

// ---------------------------------------------------------------------------
// Create
// ---------------------------------------------------------------------------

/// POST /api/jobs
///
/// Validate, create the job, and return its `pending` snapshot with 201.
pub async fn create_job(
    State(state): State<AppState>,
    Json(request): Json<CreateJobRequest>,
) -> AppResult<impl IntoResponse> {
    let id = match request {
        CreateJobRequest::Scrape {
            location,
            categories,
            concurrency,
        } => create_scrape_job(&state, location, categories, concurrency)?,
        CreateJobRequest::Enrich {
            targets,
            concurrency,
        } => create_enrich_job(&state, targets, concurrency),
        CreateJobRequest::Cleanup { concurrency } => {
            let concurrency = concurrency.unwrap_or(DEFAULT_CONCURRENCY);
            state.registry.create(
                JobKind::Cleanup,
                "duplicate cleanup",
                concurrency,
                Box::new(DuplicateCleanupSource {
                    pool: state.pool.clone(),
                }),
            )
        }
    };

    let snapshot = state
        .registry
        .get(id)
        .ok_or(AppError::InternalError("job vanished after creation".into()))?;
    Ok((StatusCode::CREATED, Json(snapshot)))
}

fn create_scrape_job(
    state: &AppState,
    location: String,
    categories: Vec<String>,
    concurrency: Option<usize>,
) -> AppResult<JobId> {
    if location.trim().is_empty() {
        return Err(CoreError::Validation("A search location is required".into()).into());
    }
    if categories.is_empty() {
        return Err(CoreError::Validation("At least one category is required".into()).into());
    }
    let categories = categories
        .iter()
        .map(|c| ContractorCategory::parse(c))
        .collect::<Result<Vec<_>, _>>()?;

    let label = format!("{location} ({} categories)", categories.len());
    Ok(state.registry.create(
        JobKind::Scrape,
        label,
        concurrency.unwrap_or(DEFAULT_CONCURRENCY),
        Box::new(ScrapeSource {
            pool: state.pool.clone(),
            search: state.search.clone(),
            extractor: state.extractor.clone(),
            location,
            categories,
        }),
    ))
}

fn create_enrich_job(
    state: &AppState,
    targets: EnrichmentTargets,
    concurrency: Option<usize>,
) -> JobId {
    let label = match (&targets.category, &targets.state) {
        (Some(category), Some(st)) => format!("enrich {category} in {st}"),
        (Some(category), None) => format!("enrich {category}"),
        (None, Some(st)) => format!("enrich records in {st}"),
        (None, None) => "enrich records".to_string(),
    };
    state.registry.create(
        JobKind::Enrich,
        label,
        concurrency.unwrap_or(DEFAULT_CONCURRENCY),
        Box::new(EnrichSource {
            pool: state.pool.clone(),
            search: state.search.clone(),
            extractor: state.extractor.clone(),
            targets,
        }),
    )
}

// ---------------------------------------------------------------------------
// List / get / cancel
// ---------------------------------------------------------------------------

/// GET /api/jobs?kind=
pub async fn list_jobs(
    State(state): State<AppState>,
    Query(params): Query<JobListQuery>,
) -> AppResult<impl IntoResponse> {
    let kind = params
        .kind
        .as_deref()
        .map(|k| {
            k.parse::<JobKind>()
                .map_err(|e| AppError::BadRequest(e.to_string()))
        })
        .transpose()?;

    Ok(Json(state.registry.list(kind)))
}

/// GET /api/jobs/{id}
pub async fn get_job(
    State(state): State<AppState>,
    Path(job_id): Path<JobId>,
) -> AppResult<impl IntoResponse> {
    let snapshot = state
        .registry
        .get(job_id)
        .ok_or(prospector_engine::RegistryError::NotFound(job_id))?;
    Ok(Json(snapshot))
}

/// DELETE /api/jobs/{id}
///
/// Request cancellation. Cooperative: in-flight units finish, so the
/// returned snapshot usually still reads `running`. Cancelling a
/// terminal job is an idempotent no-op returning the terminal snapshot.
pub async fn cancel_job(
    State(state): State<AppState>,
    Path(job_id): Path<JobId>,
) -> AppResult<impl IntoResponse> {
    let snapshot = state.registry.cancel(job_id)?;
    tracing::info!(job_id, status = %snapshot.status, "Job cancellation handled");
    Ok(Json(snapshot))
}
