//! Wipe-and-recreate of the published collections from seed data.
//!
//! The sequence is not transactional. A failure part-way leaves the backend
//! partially wiped or partially repopulated, and concurrent readers may see
//! either state while a reset runs.

use crate::backend::{DataBackend, QueryPairs, Resource};
use crate::error::{Error, Result};
use crate::seed::SeedData;
use serde::{Deserialize, Serialize};

/// Records created per collection by a reset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResetCounts {
    pub customers: usize,
    #[serde(rename = "Leads")]
    pub leads: usize,
}

/// Replace `customers` and then `Leads` with the seed records.
/// Stops at the first failing call.
pub async fn reset_from_seed(backend: &dyn DataBackend, seed: &SeedData) -> Result<ResetCounts> {
    let customers = republish(backend, Resource::Customers, &seed.customers).await?;
    let leads = republish(backend, Resource::Leads, &seed.leads).await?;
    Ok(ResetCounts { customers, leads })
}

async fn republish<T: Serialize>(
    backend: &dyn DataBackend,
    resource: Resource,
    records: &[T],
) -> Result<usize> {
    let removed = backend.delete_all(resource).await?;
    tracing::debug!(%resource, removed, "cleared collection");

    for record in records {
        let record = serde_json::to_value(record)
            .map_err(|e| Error::Internal(format!("failed to encode seed record: {}", e)))?;
        backend.create(resource, record, &QueryPairs::new()).await?;
    }

    tracing::info!(%resource, created = records.len(), "republished collection");
    Ok(records.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MemoryBackend;
    use serde_json::json;

    #[tokio::test]
    async fn reset_restores_seed_counts() {
        let backend = MemoryBackend::seeded();
        backend
            .create(Resource::Customers, json!({ "name": "Stray Co" }), &vec![])
            .await
            .unwrap();
        backend.delete(Resource::Leads, "3", &vec![]).await.unwrap();

        let counts = reset_from_seed(&backend, &SeedData::build()).await.unwrap();
        assert_eq!(
            counts,
            ResetCounts {
                customers: 10,
                leads: 95
            }
        );
        assert_eq!(
            serde_json::to_value(counts).unwrap(),
            json!({ "customers": 10, "Leads": 95 })
        );

        let customers = backend.list(Resource::Customers, &vec![]).await.unwrap();
        assert_eq!(customers.total, Some(10));
        let leads = backend.list(Resource::Leads, &vec![]).await.unwrap();
        assert_eq!(leads.total, Some(95));
        assert!(backend.get(Resource::Leads, "3", &vec![]).await.is_ok());
    }
}
