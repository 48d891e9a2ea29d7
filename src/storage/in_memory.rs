use super::traits::RecordStore;
use crate::error::{Result, RollupError};
use crate::types::{FieldMap, ItemKey, StoreItem};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;

type Partitions = HashMap<String, BTreeMap<i64, FieldMap>>;

/// In-memory store for development and tests
#[derive(Clone)]
pub struct InMemoryStore {
    partitions: Arc<Mutex<Partitions>>,
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            partitions: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, Partitions>> {
        self.partitions.lock().map_err(|_| RollupError::Store {
            message: "in-memory store lock poisoned".to_string(),
        })
    }

    /// Number of items across all partitions
    pub fn item_count(&self) -> Result<usize> {
        Ok(self.lock()?.values().map(BTreeMap::len).sum())
    }

    /// Every item in partition `pk`, ordered by `SK`
    pub fn partition(&self, pk: &str) -> Result<Vec<StoreItem>> {
        self.query_partition(pk, i64::MIN, i64::MAX)
    }

    fn query_partition(&self, pk: &str, sk_from: i64, sk_to: i64) -> Result<Vec<StoreItem>> {
        if sk_from > sk_to {
            return Ok(Vec::new());
        }
        let partitions = self.lock()?;
        let items = partitions
            .get(pk)
            .map(|rows| {
                rows.range(sk_from..=sk_to)
                    .map(|(sk, data)| StoreItem {
                        pk: pk.to_string(),
                        sk: *sk,
                        data: data.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default();
        Ok(items)
    }
}

#[async_trait]
impl RecordStore for InMemoryStore {
    async fn put_item(&self, item: &StoreItem) -> Result<()> {
        let mut partitions = self.lock()?;
        partitions
            .entry(item.pk.clone())
            .or_default()
            .insert(item.sk, item.data.clone());

        debug!("Stored item {} / {}", item.pk, item.sk);
        Ok(())
    }

    async fn query_range(&self, pk: &str, sk_from: i64, sk_to: i64) -> Result<Vec<StoreItem>> {
        let items = self.query_partition(pk, sk_from, sk_to)?;
        debug!("Range query on {} returned {} items", pk, items.len());
        Ok(items)
    }

    async fn batch_get(&self, keys: &[ItemKey]) -> Result<Vec<StoreItem>> {
        let partitions = self.lock()?;
        let items = keys
            .iter()
            .filter_map(|key| {
                partitions
                    .get(&key.pk)
                    .and_then(|rows| rows.get(&key.sk))
                    .map(|data| StoreItem {
                        pk: key.pk.clone(),
                        sk: key.sk,
                        data: data.clone(),
                    })
            })
            .collect();
        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(pk: &str, sk: i64, value: f64) -> StoreItem {
        StoreItem {
            pk: pk.to_string(),
            sk,
            data: [("v".to_string(), value)].into(),
        }
    }

    #[tokio::test]
    async fn range_query_is_inclusive_and_ordered() {
        let store = InMemoryStore::new();
        for sk in [30, 10, 20, 40] {
            store.put_item(&item("2024#1#1", sk, sk as f64)).await.unwrap();
        }
        store.put_item(&item("2024#1#2", 20, 0.0)).await.unwrap();

        let items = store.query_range("2024#1#1", 10, 30).await.unwrap();
        let sks: Vec<i64> = items.iter().map(|i| i.sk).collect();
        assert_eq!(sks, vec![10, 20, 30]);
        assert!(items.iter().all(|i| i.pk == "2024#1#1"));
    }

    #[tokio::test]
    async fn inverted_or_unknown_ranges_are_empty() {
        let store = InMemoryStore::new();
        store.put_item(&item("p", 5, 1.0)).await.unwrap();
        assert!(store.query_range("p", 6, 4).await.unwrap().is_empty());
        assert!(store.query_range("missing", 0, 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn put_overwrites_same_key() {
        let store = InMemoryStore::new();
        store.put_item(&item("p", 1, 1.0)).await.unwrap();
        store.put_item(&item("p", 1, 2.0)).await.unwrap();
        assert_eq!(store.item_count().unwrap(), 1);
        assert_eq!(store.partition("p").unwrap()[0].data["v"], 2.0);
    }

    #[tokio::test]
    async fn batch_get_skips_missing_keys() {
        let store = InMemoryStore::new();
        store.put_item(&item("a", 1, 1.0)).await.unwrap();
        store.put_item(&item("b", 2, 2.0)).await.unwrap();

        let found = store
            .batch_get(&[ItemKey::new("b", 2), ItemKey::new("a", 9), ItemKey::new("a", 1)])
            .await
            .unwrap();
        let keys: Vec<ItemKey> = found.iter().map(StoreItem::key).collect();
        assert_eq!(keys, vec![ItemKey::new("b", 2), ItemKey::new("a", 1)]);
    }
}
