//! CSV export with a fixed column order.

use axum::extract::{Query, State};
use axum::response::IntoResponse;

use prospector_db::models::{Contractor, ContractorFilter};
use prospector_db::repositories::ContractorRepo;

use crate::error::{AppError, AppResult};
use crate::state::AppState;

/// Export column order. Fixed; downstream spreadsheets rely on it.
const HEADER: &str =
    "Business Name,Owner Name,Category,Phone,Email,Address,City,State,Zip,Website,LinkedIn";

/// GET /api/export
///
/// Stream every matching contractor as CSV. Filters mirror the listing
/// endpoint (category, state, city, location substring).
pub async fn export_contractors(
    State(state): State<AppState>,
    Query(filter): Query<ContractorFilter>,
) -> AppResult<impl IntoResponse> {
    let records = ContractorRepo::export(&state.pool, &filter).await?;
    let filename = export_filename(&filter);

    let mut csv = String::with_capacity(records.len() * 96 + HEADER.len() + 1);
    csv.push_str(HEADER);
    csv.push('\n');
    for record in &records {
        csv.push_str(&csv_row(record));
        csv.push('\n');
    }

    axum::response::Response::builder()
        .status(200)
        .header("Content-Type", "text/csv")
        .header(
            "Content-Disposition",
            format!("attachment; filename=\"{filename}\""),
        )
        .body(axum::body::Body::from(csv))
        .map_err(|e| AppError::InternalError(e.to_string()))
}

/// Build one CSV row in the fixed column order.
fn csv_row(record: &Contractor) -> String {
    [
        record.name.as_str(),
        record.owner_name.as_deref().unwrap_or(""),
        record.category.as_str(),
        record.phone.as_deref().unwrap_or(""),
        record.email.as_deref().unwrap_or(""),
        record.address.as_deref().unwrap_or(""),
        record.city.as_deref().unwrap_or(""),
        record.state.as_deref().unwrap_or(""),
        record.zip_code.as_deref().unwrap_or(""),
        record.website.as_deref().unwrap_or(""),
        record.linkedin_url.as_deref().unwrap_or(""),
    ]
    .map(csv_escape)
    .join(",")
}

/// Quote a field when it contains a comma, quote, or newline.
fn csv_escape(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

/// Derive the download filename from the active filters.
fn export_filename(filter: &ContractorFilter) -> String {
    let mut parts = vec!["contractors".to_string()];
    if let Some(state) = &filter.state {
        parts.push(state.to_uppercase());
    }
    if let Some(city) = &filter.city {
        parts.push(city.replace(' ', "_"));
    }
    if let Some(category) = &filter.category {
        parts.push(category.clone());
    }
    format!("{}.csv", parts.join("_"))
}
