//! Enrichment job: one unit per contractor record, each unit searching
//! the web for the owner's contact details and applying validated
//! extraction results back to the store.

use std::sync::Arc;

use async_trait::async_trait;

use prospector_db::models::{Contractor, EnrichmentTargets, EnrichmentUpdate};
use prospector_db::repositories::ContractorRepo;
use prospector_db::DbPool;
use prospector_engine::{UnitSource, WorkUnit};

use crate::clients::{ExtractionContext, LeadExtractor, SearchClient, SearchHit};

/// Search results fetched per query.
const RESULTS_PER_QUERY: usize = 3;

/// Queries issued per record; the rest of the query list is skipped to
/// bound API usage.
const QUERIES_PER_RECORD: usize = 2;

/// Materializes one work unit per record matching the target filter.
pub struct EnrichSource {
    pub pool: DbPool,
    pub search: Arc<dyn SearchClient>,
    pub extractor: Arc<dyn LeadExtractor>,
    pub targets: EnrichmentTargets,
}

#[async_trait]
impl UnitSource for EnrichSource {
    async fn materialize(self: Box<Self>) -> anyhow::Result<Vec<WorkUnit>> {
        let records = ContractorRepo::enrichment_targets(&self.pool, &self.targets).await?;
        tracing::info!(records = records.len(), "Materialized enrichment units");

        Ok(records
            .into_iter()
            .map(|record| {
                let pool = self.pool.clone();
                let search = Arc::clone(&self.search);
                let extractor = Arc::clone(&self.extractor);
                let label = record.name.clone();
                WorkUnit::new(label, move || {
                    enrich_record(pool, search, extractor, record)
                })
            })
            .collect())
    }
}

/// Enrich a single record: search, extract, validate, persist.
async fn enrich_record(
    pool: DbPool,
    search: Arc<dyn SearchClient>,
    extractor: Arc<dyn LeadExtractor>,
    record: Contractor,
) -> anyhow::Result<serde_json::Value> {
    let context = ExtractionContext {
        business_name: record.name.clone(),
        city: record.city.clone().unwrap_or_default(),
        state: record.state.clone().unwrap_or_default(),
        category: record.category.clone(),
    };

    // Collect search context from a couple of targeted queries.
    let mut hits: Vec<SearchHit> = Vec::new();
    for query in build_queries(&context).into_iter().take(QUERIES_PER_RECORD) {
        match search.search(&query, RESULTS_PER_QUERY).await {
            Ok(results) => hits.extend(results),
            Err(e) => tracing::debug!(query = %query, error = %e, "Search query failed"),
        }
    }
    if hits.is_empty() {
        anyhow::bail!("no search results for '{}'", record.name);
    }

    let source_urls: Vec<String> = hits.iter().map(|h| h.url.clone()).collect();
    let search_text = hits
        .iter()
        .map(|h| format!("--- Source: {} ---\n{}\n{}", h.url, h.title, h.content))
        .collect::<Vec<_>>()
        .join("\n");

    let contact = extractor
        .extract_contact(&context, &search_text, &source_urls)
        .await?;

    if !contact.has_data() {
        anyhow::bail!("extraction found no usable contact data for '{}'", record.name);
    }

    ContractorRepo::apply_enrichment(
        &pool,
        record.id,
        &EnrichmentUpdate {
            owner_name: contact.owner_name.clone(),
            email: contact.email.clone(),
            linkedin_url: contact.linkedin_url.clone(),
            confidence: contact.confidence,
        },
    )
    .await?;

    tracing::info!(
        contractor_id = record.id,
        name = %record.name,
        owner = contact.owner_name.as_deref().unwrap_or("-"),
        "Record enriched",
    );

    Ok(serde_json::json!({
        "contractor_id": record.id,
        "owner_name": contact.owner_name,
        "email": contact.email,
        "linkedin_url": contact.linkedin_url,
        "confidence": contact.confidence,
    }))
}

/// Targeted queries for finding owner information.
fn build_queries(context: &ExtractionContext) -> Vec<String> {
    let ExtractionContext {
        business_name,
        city,
        state,
        category,
    } = context;
    vec![
        format!("\"{business_name}\" {city} {state} owner founder"),
        format!("\"{business_name}\" {city} owner name contact"),
        format!("\"{business_name}\" {state} {category} owner linkedin"),
        format!("\"{business_name}\" about us team founder"),
    ]
}
