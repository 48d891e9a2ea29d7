use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Named numeric metric values. Ordered so output is stable.
pub type FieldMap = BTreeMap<String, f64>;

/// One raw timestamped submission of named numeric fields
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    /// Seconds since the epoch, assigned by the server at ingestion
    pub timestamp: i64,
    pub fields: FieldMap,
}

/// One rolled-up (averaged) set of fields for a period instance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateRecord {
    pub key: String,
    /// Start of the aggregated window, seconds since the epoch
    pub timestamp: i64,
    pub fields: FieldMap,
}

/// Record shape persisted by every store adapter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreItem {
    #[serde(rename = "PK")]
    pub pk: String,
    #[serde(rename = "SK")]
    pub sk: i64,
    #[serde(rename = "DATA")]
    pub data: FieldMap,
}

/// Primary key of a [`StoreItem`]
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ItemKey {
    pub pk: String,
    pub sk: i64,
}

impl ItemKey {
    pub fn new(pk: impl Into<String>, sk: i64) -> Self {
        Self { pk: pk.into(), sk }
    }
}

impl StoreItem {
    pub fn key(&self) -> ItemKey {
        ItemKey::new(self.pk.clone(), self.sk)
    }
}

impl From<StoreItem> for Reading {
    fn from(item: StoreItem) -> Self {
        Reading {
            timestamp: item.sk,
            fields: item.data,
        }
    }
}

impl From<AggregateRecord> for StoreItem {
    fn from(record: AggregateRecord) -> Self {
        StoreItem {
            pk: record.key,
            sk: record.timestamp,
            data: record.fields,
        }
    }
}
