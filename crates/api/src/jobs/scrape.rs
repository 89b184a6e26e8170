//! Scrape job: one unit per (category, location) pair.
//!
//! Each unit discovers candidate business pages through the search
//! client, extracts a structured record from each page, and merges the
//! results into the store.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;

use prospector_core::catalog::ContractorCategory;
use prospector_db::repositories::{ContractorRepo, MergeOutcome};
use prospector_db::DbPool;
use prospector_engine::{UnitSource, WorkUnit};

use crate::clients::{LeadExtractor, SearchClient};

/// Candidate pages fetched per category search.
const CANDIDATES_PER_CATEGORY: usize = 8;

/// Aggregator/social domains that never yield a usable business record.
const SKIP_DOMAINS: &[&str] = &[
    "google.com",
    "facebook.com",
    "instagram.com",
    "linkedin.com",
    "youtube.com",
    "yelp.com",
    "yellowpages.com",
    "bbb.org",
    "angieslist.com",
    "homeadvisor.com",
    "thumbtack.com",
    "nextdoor.com",
    "mapquest.com",
    "reddit.com",
    "wikipedia.org",
];

/// Materializes one work unit per requested category.
pub struct ScrapeSource {
    pub pool: DbPool,
    pub search: Arc<dyn SearchClient>,
    pub extractor: Arc<dyn LeadExtractor>,
    pub location: String,
    pub categories: Vec<ContractorCategory>,
}

#[async_trait]
impl UnitSource for ScrapeSource {
    async fn materialize(self: Box<Self>) -> anyhow::Result<Vec<WorkUnit>> {
        if self.categories.is_empty() {
            anyhow::bail!("no categories selected for scrape");
        }

        Ok(self
            .categories
            .iter()
            .map(|category| {
                let pool = self.pool.clone();
                let search = Arc::clone(&self.search);
                let extractor = Arc::clone(&self.extractor);
                let location = self.location.clone();
                let category = *category;
                WorkUnit::new(category.as_str(), move || {
                    scrape_category(pool, search, extractor, category, location)
                })
            })
            .collect())
    }
}

/// Scrape one category in one location.
async fn scrape_category(
    pool: DbPool,
    search: Arc<dyn SearchClient>,
    extractor: Arc<dyn LeadExtractor>,
    category: ContractorCategory,
    location: String,
) -> anyhow::Result<serde_json::Value> {
    // Discover candidate pages across the category's search terms.
    let mut seen_domains: HashSet<String> = HashSet::new();
    let mut candidates = Vec::new();
    for term in category.search_terms() {
        let query = format!("{term} {location}");
        let hits = search.search(&query, CANDIDATES_PER_CATEGORY).await?;
        for hit in hits {
            let Some(domain) = domain_of(&hit.url) else {
                continue;
            };
            if should_skip_domain(&domain) || !seen_domains.insert(domain) {
                continue;
            }
            candidates.push(hit);
        }
    }

    // Extract a record from each candidate page; extraction misses are
    // per-page noise, not unit failures.
    let mut inserted = 0u64;
    let mut merged = 0u64;
    for candidate in &candidates {
        let page_text = format!("{}\n{}", candidate.title, candidate.content);
        match extractor
            .extract_record(category.as_str(), &location, &candidate.url, &page_text)
            .await
        {
            Ok(Some(record)) => match ContractorRepo::merge_or_insert(&pool, &record).await? {
                MergeOutcome::Inserted(id) => {
                    inserted += 1;
                    tracing::info!(
                        contractor_id = id,
                        name = %record.name,
                        category = %category,
                        "New contractor found",
                    );
                }
                MergeOutcome::Merged(_) => merged += 1,
            },
            Ok(None) => {}
            Err(e) => {
                tracing::debug!(url = %candidate.url, error = %e, "Record extraction failed");
            }
        }
    }

    Ok(serde_json::json!({
        "category": category.as_str(),
        "candidates": candidates.len(),
        "inserted": inserted,
        "merged": merged,
    }))
}

/// Host part of a URL, lowercased, without a `www.` prefix.
fn domain_of(url: &str) -> Option<String> {
    let rest = url.split("://").nth(1).unwrap_or(url);
    let host = rest.split('/').next()?.to_lowercase();
    let host = host.strip_prefix("www.").unwrap_or(&host).to_string();
    if host.is_empty() {
        None
    } else {
        Some(host)
    }
}

fn should_skip_domain(domain: &str) -> bool {
    SKIP_DOMAINS.iter().any(|skip| domain.ends_with(skip))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn domain_extraction_handles_protocol_and_www() {
        assert_eq!(
            domain_of("https://www.smithplumbing.example/about"),
            Some("smithplumbing.example".into())
        );
        assert_eq!(domain_of("smithplumbing.example"), Some("smithplumbing.example".into()));
    }

    #[test]
    fn aggregator_domains_are_skipped() {
        assert!(should_skip_domain("yelp.com"));
        assert!(should_skip_domain("m.facebook.com"));
        assert!(!should_skip_domain("smithplumbing.example"));
    }
}
