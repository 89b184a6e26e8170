//! Contractor entity models and DTOs.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use prospector_core::dedup::{self, IdentityKey};
use prospector_core::{DbId, Timestamp};

/// A row from the `contractors` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Contractor {
    pub id: DbId,
    pub name: String,
    pub owner_name: Option<String>,
    pub category: String,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip_code: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub website: Option<String>,
    pub linkedin_url: Option<String>,
    /// Where the record came from (`scraper`, `csv_import`, ...).
    pub source: String,
    /// The location string the originating search used.
    pub location_searched: String,
    /// Whether AI enrichment was attempted.
    pub enriched: bool,
    pub enrichment_confidence: f64,
    pub created_at: Timestamp,
    pub enriched_at: Option<Timestamp>,
}

impl Contractor {
    /// Identity key for duplicate grouping; `None` when the name is
    /// unusable.
    pub fn identity_key(&self) -> Option<IdentityKey> {
        dedup::identity_key(&self.name, self.phone.as_deref(), self.address.as_deref())
    }

    /// Number of filled optional contact fields, used to pick the keeper
    /// of a duplicate group.
    pub fn completeness(&self) -> usize {
        dedup::completeness(&[
            self.owner_name.as_deref(),
            self.address.as_deref(),
            self.city.as_deref(),
            self.state.as_deref(),
            self.zip_code.as_deref(),
            self.phone.as_deref(),
            self.email.as_deref(),
            self.website.as_deref(),
            self.linkedin_url.as_deref(),
        ])
    }
}

/// An incoming contractor record (scrape result or CSV import row).
#[derive(Debug, Clone, Deserialize)]
pub struct NewContractor {
    pub name: String,
    #[serde(default)]
    pub owner_name: Option<String>,
    pub category: String,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub zip_code: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub website: Option<String>,
    #[serde(default)]
    pub linkedin_url: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub location_searched: Option<String>,
}

impl NewContractor {
    pub fn identity_key(&self) -> Option<IdentityKey> {
        dedup::identity_key(&self.name, self.phone.as_deref(), self.address.as_deref())
    }
}

/// Filters for listing and exporting contractors.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ContractorFilter {
    /// Exact category match.
    pub category: Option<String>,
    /// Exact state match (case-insensitive).
    pub state: Option<String>,
    /// Exact city match (case-insensitive).
    pub city: Option<String>,
    /// Substring match on `location_searched`.
    pub location: Option<String>,
    /// Substring match on name, address, or phone.
    pub search: Option<String>,
}

/// One page of contractors.
#[derive(Debug, Serialize)]
pub struct ContractorPage {
    pub items: Vec<Contractor>,
    pub total: i64,
    pub page: i64,
    pub per_page: i64,
    pub total_pages: i64,
}

/// Selection criteria for records that should be enriched.
#[derive(Debug, Clone, Deserialize)]
pub struct EnrichmentTargets {
    /// Only records missing an owner name or email.
    #[serde(default = "default_true")]
    pub only_missing: bool,
    pub category: Option<String>,
    pub state: Option<String>,
    pub limit: Option<i64>,
    /// Restrict to specific record ids (used for post-import follow-on
    /// enrichment).
    #[serde(skip)]
    pub ids: Option<Vec<DbId>>,
}

impl Default for EnrichmentTargets {
    fn default() -> Self {
        Self {
            only_missing: true,
            category: None,
            state: None,
            limit: None,
            ids: None,
        }
    }
}

fn default_true() -> bool {
    true
}

/// Enrichment data applied to a record after a successful extraction.
#[derive(Debug, Clone)]
pub struct EnrichmentUpdate {
    pub owner_name: Option<String>,
    pub email: Option<String>,
    pub linkedin_url: Option<String>,
    pub confidence: f64,
}
