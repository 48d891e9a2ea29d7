use crate::bucket::day_bucket_key;
use crate::error::{Result, RollupError};
use crate::storage::RecordStore;
use crate::types::{FieldMap, StoreItem};
use crate::validation;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::info;

/// Validated ingestion body. Extra top-level fields are dropped.
#[derive(Debug, Clone, Deserialize)]
pub struct IngestRequest {
    pub data: FieldMap,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IngestResponse {
    /// Seconds since the epoch
    pub timestamp: i64,
    pub data: FieldMap,
}

/// Stores one reading per request under the day bucket of its arrival time
pub struct IngestUseCase {
    store: Arc<dyn RecordStore>,
}

impl IngestUseCase {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    pub async fn ingest(&self, body: &Value) -> Result<IngestResponse> {
        self.ingest_at(body, Utc::now()).await
    }

    /// Validate `body` and persist it as a reading received at `now`
    pub async fn ingest_at(&self, body: &Value, now: DateTime<Utc>) -> Result<IngestResponse> {
        let request = validation::ingest_request(body).map_err(|e| {
            crate::metrics::validation_failed("ingest");
            RollupError::Validation(e)
        })?;

        let key = day_bucket_key(now);
        let timestamp = now.timestamp();
        let item = StoreItem {
            pk: key,
            sk: timestamp,
            data: request.data,
        };
        self.store.put_item(&item).await?;

        crate::metrics::reading_ingested();
        info!(key = %item.pk, timestamp, fields = item.data.len(), "Stored reading");

        Ok(IngestResponse {
            timestamp,
            data: item.data,
        })
    }
}
