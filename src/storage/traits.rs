use crate::error::Result;
use crate::types::{ItemKey, StoreItem};
use async_trait::async_trait;

/// Key-value store partitioned by `PK` and ordered by integer `SK`
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Point write by `(PK, SK)`. An existing item under the same key is replaced.
    async fn put_item(&self, item: &StoreItem) -> Result<()>;

    /// Items in partition `pk` with `sk_from <= SK <= sk_to`, ordered by `SK`
    async fn query_range(&self, pk: &str, sk_from: i64, sk_to: i64) -> Result<Vec<StoreItem>>;

    /// Items for an explicit key list, in request order. Missing keys are skipped.
    async fn batch_get(&self, keys: &[ItemKey]) -> Result<Vec<StoreItem>>;
}
