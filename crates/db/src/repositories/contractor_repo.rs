//! Repository for the `contractors` table, including the duplicate
//! merge/cleanup engine.
//!
//! Identity matching runs over normalized values computed in Rust, so
//! candidate rows are loaded and compared in memory rather than matched
//! with SQL string functions.

use std::collections::HashMap;

use chrono::Utc;
use sqlx::QueryBuilder;

use prospector_core::dedup::{self, IdentityKey};
use prospector_core::DbId;

use crate::error::StoreError;
use crate::models::contractor::{
    Contractor, ContractorFilter, ContractorPage, EnrichmentTargets, EnrichmentUpdate,
    NewContractor,
};
use crate::models::stats::{CategoryCount, CityState, EnrichmentStats, StoreLocations, StoreStats};
use crate::DbPool;

/// Column list for `contractors` queries.
const COLUMNS: &str = "\
    id, name, owner_name, category, address, city, state, zip_code, \
    phone, email, website, linkedin_url, source, location_searched, \
    enriched, enrichment_confidence, created_at, enriched_at";

/// Fields the merge policy applies to, in update order.
const MERGE_FIELDS: &[&str] = &[
    "owner_name",
    "address",
    "city",
    "state",
    "zip_code",
    "phone",
    "email",
    "website",
    "linkedin_url",
];

/// Outcome of a [`ContractorRepo::merge_or_insert`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    /// A new row was inserted.
    Inserted(DbId),
    /// An existing row with the same identity key absorbed the record.
    Merged(DbId),
}

/// A group of rows sharing one identity key. The keeper survives; the
/// losers are merged into it and deleted.
#[derive(Debug, Clone)]
pub struct DuplicateGroup {
    pub keeper_id: DbId,
    pub loser_ids: Vec<DbId>,
}

/// CRUD and cleanup operations for contractor records.
pub struct ContractorRepo;

impl ContractorRepo {
    // -----------------------------------------------------------------------
    // Insert / merge
    // -----------------------------------------------------------------------

    /// Insert a record without duplicate detection.
    pub async fn insert(pool: &DbPool, record: &NewContractor) -> Result<DbId, StoreError> {
        let result = sqlx::query(
            "INSERT INTO contractors \
             (name, owner_name, category, address, city, state, zip_code, \
              phone, email, website, linkedin_url, source, location_searched, created_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&record.name)
        .bind(&record.owner_name)
        .bind(&record.category)
        .bind(&record.address)
        .bind(&record.city)
        .bind(&record.state)
        .bind(&record.zip_code)
        .bind(&record.phone)
        .bind(&record.email)
        .bind(&record.website)
        .bind(&record.linkedin_url)
        .bind(record.source.as_deref().unwrap_or("scraper"))
        .bind(record.location_searched.as_deref().unwrap_or("unknown"))
        .bind(Utc::now())
        .execute(pool)
        .await
        .map_err(StoreError::Db)?;

        Ok(result.last_insert_rowid())
    }

    /// Insert the record, or merge it into an existing row with the same
    /// identity key.
    ///
    /// Merge policy: a non-empty incoming field overwrites the stored
    /// value; an empty incoming field never clears one. Inserting the
    /// same record twice therefore yields one stored row.
    pub async fn merge_or_insert(
        pool: &DbPool,
        record: &NewContractor,
    ) -> Result<MergeOutcome, StoreError> {
        if let Some(key) = record.identity_key() {
            if let Some(existing) = Self::find_by_identity(pool, &key).await? {
                let id = existing.id;
                Self::merge_into(pool, &existing, record).await?;
                tracing::debug!(
                    contractor_id = id,
                    name = %record.name,
                    "Merged incoming record into existing contractor",
                );
                return Ok(MergeOutcome::Merged(id));
            }
        }

        let id = Self::insert(pool, record).await?;
        Ok(MergeOutcome::Inserted(id))
    }

    /// Find the stored row whose identity key matches `key`.
    async fn find_by_identity(
        pool: &DbPool,
        key: &IdentityKey,
    ) -> Result<Option<Contractor>, StoreError> {
        // Normalized comparison happens in Rust; the oldest match wins.
        let query = format!("SELECT {COLUMNS} FROM contractors ORDER BY id ASC");
        let rows = sqlx::query_as::<_, Contractor>(&query)
            .fetch_all(pool)
            .await
            .map_err(StoreError::Db)?;

        Ok(rows
            .into_iter()
            .find(|row| row.identity_key().as_ref() == Some(key)))
    }

    /// Apply the merge policy field-by-field and persist any changes.
    async fn merge_into(
        pool: &DbPool,
        existing: &Contractor,
        incoming: &NewContractor,
    ) -> Result<(), StoreError> {
        let existing_fields: [(&str, Option<&str>); 9] = [
            ("owner_name", existing.owner_name.as_deref()),
            ("address", existing.address.as_deref()),
            ("city", existing.city.as_deref()),
            ("state", existing.state.as_deref()),
            ("zip_code", existing.zip_code.as_deref()),
            ("phone", existing.phone.as_deref()),
            ("email", existing.email.as_deref()),
            ("website", existing.website.as_deref()),
            ("linkedin_url", existing.linkedin_url.as_deref()),
        ];
        let incoming_fields: [Option<&str>; 9] = [
            incoming.owner_name.as_deref(),
            incoming.address.as_deref(),
            incoming.city.as_deref(),
            incoming.state.as_deref(),
            incoming.zip_code.as_deref(),
            incoming.phone.as_deref(),
            incoming.email.as_deref(),
            incoming.website.as_deref(),
            incoming.linkedin_url.as_deref(),
        ];

        let mut updates: Vec<(&str, String)> = Vec::new();
        for ((column, current), candidate) in existing_fields.into_iter().zip(incoming_fields) {
            let merged = dedup::merge_field(current, candidate);
            if merged.as_deref() != current {
                if let Some(value) = merged {
                    updates.push((column, value));
                }
            }
        }

        if updates.is_empty() {
            return Ok(());
        }

        let mut builder = QueryBuilder::new("UPDATE contractors SET ");
        let mut separated = builder.separated(", ");
        for (column, value) in &updates {
            separated.push(format!("{column} = "));
            separated.push_bind_unseparated(value.clone());
        }
        builder.push(" WHERE id = ");
        builder.push_bind(existing.id);
        builder.build().execute(pool).await.map_err(StoreError::Db)?;

        Ok(())
    }

    // -----------------------------------------------------------------------
    // Duplicate cleanup
    // -----------------------------------------------------------------------

    /// Group all stored rows by identity key.
    ///
    /// Within a group the most complete record is the keeper; ties break
    /// toward the earliest created (lowest id on equal timestamps).
    pub async fn duplicate_groups(pool: &DbPool) -> Result<Vec<DuplicateGroup>, StoreError> {
        let query = format!("SELECT {COLUMNS} FROM contractors ORDER BY created_at ASC, id ASC");
        let rows = sqlx::query_as::<_, Contractor>(&query)
            .fetch_all(pool)
            .await
            .map_err(StoreError::Db)?;

        let mut by_key: HashMap<IdentityKey, Vec<Contractor>> = HashMap::new();
        for row in rows {
            if let Some(key) = row.identity_key() {
                by_key.entry(key).or_default().push(row);
            }
        }

        let mut groups: Vec<DuplicateGroup> = by_key
            .into_values()
            .filter(|members| members.len() > 1)
            .map(|members| {
                // Members arrive oldest-first; a strict comparison keeps
                // the earliest record on completeness ties.
                let keeper_id = members
                    .iter()
                    .fold((0usize, members[0].id), |(best, keeper), row| {
                        let score = row.completeness();
                        if score > best {
                            (score, row.id)
                        } else {
                            (best, keeper)
                        }
                    })
                    .1;
                DuplicateGroup {
                    keeper_id,
                    loser_ids: members
                        .iter()
                        .map(|m| m.id)
                        .filter(|id| *id != keeper_id)
                        .collect(),
                }
            })
            .collect();

        groups.sort_by_key(|g| g.keeper_id);
        Ok(groups)
    }

    /// Merge one duplicate group: fill the keeper's empty fields from
    /// the losers, then delete the losers. Returns the number of rows
    /// removed.
    pub async fn merge_group(pool: &DbPool, group: &DuplicateGroup) -> Result<u64, StoreError> {
        let keeper = match Self::find_by_id(pool, group.keeper_id).await? {
            Some(keeper) => keeper,
            // The keeper vanished (e.g. concurrent location cleanup);
            // nothing to merge into.
            None => return Ok(0),
        };

        let mut merged = keeper.clone();
        let mut removed = 0u64;
        for loser_id in &group.loser_ids {
            let Some(loser) = Self::find_by_id(pool, *loser_id).await? else {
                continue;
            };
            // Keeper fields win; losers only fill gaps.
            for column in MERGE_FIELDS {
                let current = field_of(&merged, column).map(str::to_string);
                let candidate = field_of(&loser, column).map(str::to_string);
                if !dedup::is_filled(current.as_deref()) && dedup::is_filled(candidate.as_deref()) {
                    set_field(&mut merged, column, candidate);
                }
            }
            sqlx::query("DELETE FROM contractors WHERE id = ?")
                .bind(loser_id)
                .execute(pool)
                .await
                .map_err(StoreError::Db)?;
            removed += 1;
        }

        Self::persist_merge_fields(pool, &keeper, &merged).await?;
        if removed > 0 {
            tracing::info!(
                keeper_id = keeper.id,
                removed,
                "Merged duplicate contractor group",
            );
        }
        Ok(removed)
    }

    /// Remove every duplicate group in one pass. Returns the number of
    /// rows removed. Afterwards no two rows share an identity key.
    pub async fn cleanup_duplicates(pool: &DbPool) -> Result<u64, StoreError> {
        let groups = Self::duplicate_groups(pool).await?;
        let mut removed = 0u64;
        for group in &groups {
            removed += Self::merge_group(pool, group).await?;
        }
        Ok(removed)
    }

    /// Persist keeper fields that changed during a group merge.
    async fn persist_merge_fields(
        pool: &DbPool,
        before: &Contractor,
        after: &Contractor,
    ) -> Result<(), StoreError> {
        let mut updates: Vec<(&str, String)> = Vec::new();
        for column in MERGE_FIELDS {
            let old = field_of(before, column);
            let new = field_of(after, column);
            if old != new {
                if let Some(value) = new {
                    updates.push((*column, value.to_string()));
                }
            }
        }
        if updates.is_empty() {
            return Ok(());
        }

        let mut builder = QueryBuilder::new("UPDATE contractors SET ");
        let mut separated = builder.separated(", ");
        for (column, value) in &updates {
            separated.push(format!("{column} = "));
            separated.push_bind_unseparated(value.clone());
        }
        builder.push(" WHERE id = ");
        builder.push_bind(before.id);
        builder.build().execute(pool).await.map_err(StoreError::Db)?;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Location cleanup
    // -----------------------------------------------------------------------

    /// Delete every record whose state is not in `keep` (uppercased
    /// comparison). Records without a state are removed as well.
    ///
    /// An empty keep-set would delete everything and is rejected as a
    /// validation error instead of executed.
    pub async fn cleanup_by_kept_locations(
        pool: &DbPool,
        keep: &[String],
    ) -> Result<u64, StoreError> {
        dedup::validate_keep_states(keep)
            .map_err(|e| StoreError::Validation(e.to_string()))?;

        let mut builder = QueryBuilder::new(
            "DELETE FROM contractors WHERE state IS NULL OR UPPER(state) NOT IN (",
        );
        let mut separated = builder.separated(", ");
        for state in keep {
            separated.push_bind(state.trim().to_uppercase());
        }
        builder.push(")");

        let result = builder.build().execute(pool).await.map_err(StoreError::Db)?;
        let removed = result.rows_affected();
        tracing::info!(removed, "Removed contractors outside kept locations");
        Ok(removed)
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    pub async fn find_by_id(pool: &DbPool, id: DbId) -> Result<Option<Contractor>, StoreError> {
        let query = format!("SELECT {COLUMNS} FROM contractors WHERE id = ?");
        sqlx::query_as::<_, Contractor>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
            .map_err(StoreError::Db)
    }

    /// One page of contractors matching the filter, newest first.
    pub async fn list(
        pool: &DbPool,
        filter: &ContractorFilter,
        page: i64,
        per_page: i64,
    ) -> Result<ContractorPage, StoreError> {
        let page = page.max(1);
        let per_page = per_page.clamp(1, 100);

        let mut count = QueryBuilder::new("SELECT COUNT(*) FROM contractors");
        push_filter(&mut count, filter);
        let total: i64 = count
            .build_query_scalar()
            .fetch_one(pool)
            .await
            .map_err(StoreError::Db)?;

        let mut select = QueryBuilder::new(format!("SELECT {COLUMNS} FROM contractors"));
        push_filter(&mut select, filter);
        select.push(" ORDER BY created_at DESC, id DESC LIMIT ");
        select.push_bind(per_page);
        select.push(" OFFSET ");
        select.push_bind((page - 1) * per_page);

        let items = select
            .build_query_as::<Contractor>()
            .fetch_all(pool)
            .await
            .map_err(StoreError::Db)?;

        Ok(ContractorPage {
            items,
            total,
            page,
            per_page,
            total_pages: (total + per_page - 1) / per_page,
        })
    }

    /// All contractors matching the filter, ordered for export.
    pub async fn export(
        pool: &DbPool,
        filter: &ContractorFilter,
    ) -> Result<Vec<Contractor>, StoreError> {
        let mut select = QueryBuilder::new(format!("SELECT {COLUMNS} FROM contractors"));
        push_filter(&mut select, filter);
        select.push(" ORDER BY category ASC, name ASC");
        select
            .build_query_as::<Contractor>()
            .fetch_all(pool)
            .await
            .map_err(StoreError::Db)
    }

    /// Records selected for enrichment.
    pub async fn enrichment_targets(
        pool: &DbPool,
        targets: &EnrichmentTargets,
    ) -> Result<Vec<Contractor>, StoreError> {
        let mut select = QueryBuilder::new(format!("SELECT {COLUMNS} FROM contractors WHERE 1=1"));

        if targets.only_missing {
            select.push(
                " AND (owner_name IS NULL OR owner_name = '' OR email IS NULL OR email = '')",
            );
        }
        if let Some(category) = &targets.category {
            select.push(" AND category = ");
            select.push_bind(category.clone());
        }
        if let Some(state) = &targets.state {
            select.push(" AND UPPER(state) = ");
            select.push_bind(state.to_uppercase());
        }
        if let Some(ids) = &targets.ids {
            if ids.is_empty() {
                return Ok(Vec::new());
            }
            select.push(" AND id IN (");
            let mut separated = select.separated(", ");
            for id in ids {
                separated.push_bind(*id);
            }
            select.push(")");
        }

        select.push(" ORDER BY created_at DESC, id DESC");
        if let Some(limit) = targets.limit {
            select.push(" LIMIT ");
            select.push_bind(limit.max(0));
        }

        select
            .build_query_as::<Contractor>()
            .fetch_all(pool)
            .await
            .map_err(StoreError::Db)
    }

    /// Record the outcome of an enrichment attempt. Marks the row as
    /// enriched even when no new fields were found, so it is not
    /// reselected forever.
    pub async fn apply_enrichment(
        pool: &DbPool,
        id: DbId,
        update: &EnrichmentUpdate,
    ) -> Result<(), StoreError> {
        let mut builder = QueryBuilder::new(
            "UPDATE contractors SET enriched = 1, enrichment_confidence = ",
        );
        builder.push_bind(update.confidence);
        builder.push(", enriched_at = ");
        builder.push_bind(Utc::now());

        for (column, value) in [
            ("owner_name", &update.owner_name),
            ("email", &update.email),
            ("linkedin_url", &update.linkedin_url),
        ] {
            if let Some(value) = value {
                builder.push(format!(", {column} = "));
                builder.push_bind(value.clone());
            }
        }
        builder.push(" WHERE id = ");
        builder.push_bind(id);

        builder.build().execute(pool).await.map_err(StoreError::Db)?;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Aggregates
    // -----------------------------------------------------------------------

    /// Distinct states and cities currently present in the store.
    pub async fn locations(pool: &DbPool) -> Result<StoreLocations, StoreError> {
        let states: Vec<String> = sqlx::query_scalar(
            "SELECT DISTINCT state FROM contractors \
             WHERE state IS NOT NULL AND state != '' ORDER BY state",
        )
        .fetch_all(pool)
        .await
        .map_err(StoreError::Db)?;

        let cities = sqlx::query_as::<_, CityState>(
            "SELECT DISTINCT city, state FROM contractors \
             WHERE city IS NOT NULL AND city != '' \
               AND state IS NOT NULL AND state != '' \
             ORDER BY state, city",
        )
        .fetch_all(pool)
        .await
        .map_err(StoreError::Db)?;

        Ok(StoreLocations { states, cities })
    }

    pub async fn stats(pool: &DbPool) -> Result<StoreStats, StoreError> {
        let total_contractors = Self::count_where(pool, "1=1").await?;
        let with_owner =
            Self::count_where(pool, "owner_name IS NOT NULL AND owner_name != ''").await?;
        let with_phone = Self::count_where(pool, "phone IS NOT NULL AND phone != ''").await?;
        let with_email = Self::count_where(pool, "email IS NOT NULL AND email != ''").await?;

        let categories_breakdown = sqlx::query_as::<_, CategoryCount>(
            "SELECT category, COUNT(*) as count FROM contractors \
             GROUP BY category ORDER BY count DESC, category ASC",
        )
        .fetch_all(pool)
        .await
        .map_err(StoreError::Db)?;

        Ok(StoreStats {
            total_contractors,
            with_owner,
            with_phone,
            with_email,
            categories_breakdown,
        })
    }

    pub async fn enrichment_stats(pool: &DbPool) -> Result<EnrichmentStats, StoreError> {
        let total_enriched = Self::count_where(pool, "enriched = 1").await?;
        let with_linkedin =
            Self::count_where(pool, "linkedin_url IS NOT NULL AND linkedin_url != ''").await?;
        let needs_enrichment = Self::count_where(
            pool,
            "(owner_name IS NULL OR owner_name = '') AND (email IS NULL OR email = '')",
        )
        .await?;

        let avg_confidence: Option<f64> = sqlx::query_scalar(
            "SELECT AVG(enrichment_confidence) FROM contractors WHERE enriched = 1",
        )
        .fetch_one(pool)
        .await
        .map_err(StoreError::Db)?;

        Ok(EnrichmentStats {
            total_enriched,
            with_linkedin,
            needs_enrichment,
            avg_confidence: avg_confidence.unwrap_or(0.0),
        })
    }

    async fn count_where(pool: &DbPool, condition: &str) -> Result<i64, StoreError> {
        let query = format!("SELECT COUNT(*) FROM contractors WHERE {condition}");
        sqlx::query_scalar(&query)
            .fetch_one(pool)
            .await
            .map_err(StoreError::Db)
    }
}

// ---------------------------------------------------------------------------
// Filter helpers
// ---------------------------------------------------------------------------

/// Append the WHERE clause for a [`ContractorFilter`].
fn push_filter(builder: &mut QueryBuilder<'_, sqlx::Sqlite>, filter: &ContractorFilter) {
    builder.push(" WHERE 1=1");
    if let Some(category) = &filter.category {
        builder.push(" AND category = ");
        builder.push_bind(category.clone());
    }
    if let Some(state) = &filter.state {
        builder.push(" AND UPPER(state) = ");
        builder.push_bind(state.to_uppercase());
    }
    if let Some(city) = &filter.city {
        builder.push(" AND LOWER(city) = ");
        builder.push_bind(city.to_lowercase());
    }
    if let Some(location) = &filter.location {
        builder.push(" AND location_searched LIKE ");
        builder.push_bind(format!("%{location}%"));
    }
    if let Some(search) = &filter.search {
        let pattern = format!("%{search}%");
        builder.push(" AND (name LIKE ");
        builder.push_bind(pattern.clone());
        builder.push(" OR address LIKE ");
        builder.push_bind(pattern.clone());
        builder.push(" OR phone LIKE ");
        builder.push_bind(pattern);
        builder.push(")");
    }
}

// ---------------------------------------------------------------------------
// Field access helpers
// ---------------------------------------------------------------------------

fn field_of<'a>(record: &'a Contractor, column: &str) -> Option<&'a str> {
    let value = match column {
        "owner_name" => &record.owner_name,
        "address" => &record.address,
        "city" => &record.city,
        "state" => &record.state,
        "zip_code" => &record.zip_code,
        "phone" => &record.phone,
        "email" => &record.email,
        "website" => &record.website,
        "linkedin_url" => &record.linkedin_url,
        _ => return None,
    };
    value.as_deref()
}

fn set_field(record: &mut Contractor, column: &str, value: Option<String>) {
    let slot = match column {
        "owner_name" => &mut record.owner_name,
        "address" => &mut record.address,
        "city" => &mut record.city,
        "state" => &mut record.state,
        "zip_code" => &mut record.zip_code,
        "phone" => &mut record.phone,
        "email" => &mut record.email,
        "website" => &mut record.website,
        "linkedin_url" => &mut record.linkedin_url,
        _ => return,
    };
    *slot = value;
}
