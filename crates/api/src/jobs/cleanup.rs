//! Duplicate cleanup job: one unit per duplicate group, so long
//! cleanups report progress like any other job.

use async_trait::async_trait;

use prospector_db::repositories::ContractorRepo;
use prospector_db::DbPool;
use prospector_engine::{UnitSource, WorkUnit};

/// Materializes one work unit per group of rows sharing an identity key.
pub struct DuplicateCleanupSource {
    pub pool: DbPool,
}

#[async_trait]
impl UnitSource for DuplicateCleanupSource {
    async fn materialize(self: Box<Self>) -> anyhow::Result<Vec<WorkUnit>> {
        let groups = ContractorRepo::duplicate_groups(&self.pool).await?;
        tracing::info!(groups = groups.len(), "Materialized duplicate cleanup units");

        Ok(groups
            .into_iter()
            .map(|group| {
                let pool = self.pool.clone();
                let label = format!("group:{}", group.keeper_id);
                WorkUnit::new(label, move || async move {
                    let removed = ContractorRepo::merge_group(&pool, &group).await?;
                    Ok(serde_json::json!({
                        "keeper_id": group.keeper_id,
                        "removed": removed,
                    }))
                })
            })
            .collect())
    }
}
