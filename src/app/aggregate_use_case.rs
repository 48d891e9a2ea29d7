use crate::aggregate::aggregate_average;
use crate::bucket::aggregate_bucket_key;
use crate::error::{Result, RollupError, ValidationError};
use crate::period::{Period, RollupPeriod};
use crate::resolver::resolve;
use crate::storage::RecordStore;
use crate::types::{AggregateRecord, FieldMap, Reading, StoreItem};
use crate::validation;
use chrono::{DateTime, Duration, Utc};
use futures::future::try_join_all;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::info;

/// Scheduler payload. Extra fields are ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct AggregateEvent {
    pub period: RollupPeriod,
    /// Window length, counted back from the time the job runs
    pub seconds: u64,
}

/// Outcome of one rollup run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregateSummary {
    pub period: RollupPeriod,
    pub key: String,
    /// Window start in seconds; also the aggregate's sort key
    pub timestamp: i64,
    pub buckets_scanned: usize,
    pub readings: usize,
    pub fields: FieldMap,
    /// False when the window held no readings and nothing was stored
    pub written: bool,
}

/// Rolls raw day-bucketed readings up into one averaged aggregate record
pub struct AggregateUseCase {
    store: Arc<dyn RecordStore>,
}

impl AggregateUseCase {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    pub async fn run(&self, event: &Value) -> Result<AggregateSummary> {
        self.run_at(event, Utc::now()).await
    }

    /// Validate the scheduler event and aggregate the window ending at `now`
    pub async fn run_at(&self, event: &Value, now: DateTime<Utc>) -> Result<AggregateSummary> {
        let event = validation::aggregate_event(event).map_err(|e| {
            crate::metrics::validation_failed("aggregate");
            RollupError::Validation(e)
        })?;
        self.aggregate_window(event.period, event.seconds, now).await
    }

    pub async fn aggregate_window(
        &self,
        period: RollupPeriod,
        seconds: u64,
        now: DateTime<Utc>,
    ) -> Result<AggregateSummary> {
        let from = i64::try_from(seconds)
            .ok()
            .and_then(Duration::try_seconds)
            .and_then(|window| now.checked_sub_signed(window))
            .ok_or_else(|| {
                ValidationError::new("invalid aggregation event")
                    .with_detail("/seconds", format!("{seconds} is out of range"))
            })?;

        let (sk_from, sk_to) = (from.timestamp(), now.timestamp());
        let day_keys = resolve(Period::Day, from.date_naive(), now.date_naive());

        // All-or-nothing: the first failed bucket query aborts the run.
        let batches = try_join_all(
            day_keys
                .iter()
                .map(|day| self.store.query_range(day, sk_from, sk_to)),
        )
        .await?;

        let readings: Vec<Reading> = batches.into_iter().flatten().map(Reading::from).collect();
        let fields = aggregate_average(&readings);
        let key = aggregate_bucket_key(period, now);
        crate::metrics::aggregation_readings(readings.len());

        let mut summary = AggregateSummary {
            period,
            key,
            timestamp: sk_from,
            buckets_scanned: day_keys.len(),
            readings: readings.len(),
            fields,
            written: false,
        };

        if summary.fields.is_empty() {
            crate::metrics::aggregation_skipped();
            info!(
                period = %period,
                buckets = summary.buckets_scanned,
                "No readings in window, skipping aggregate write"
            );
            return Ok(summary);
        }

        let record = AggregateRecord {
            key: summary.key.clone(),
            timestamp: summary.timestamp,
            fields: summary.fields.clone(),
        };
        self.store.put_item(&StoreItem::from(record)).await?;
        summary.written = true;

        crate::metrics::aggregation_written();
        info!(
            key = %summary.key,
            readings = summary.readings,
            fields = summary.fields.len(),
            "Stored aggregate"
        );
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Result;
    use crate::storage::InMemoryStore;
    use crate::types::ItemKey;
    use async_trait::async_trait;
    use chrono::TimeZone;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn reading(pk: &str, sk: i64, fields: &[(&str, f64)]) -> StoreItem {
        StoreItem {
            pk: pk.to_string(),
            sk,
            data: fields.iter().map(|(k, v)| (k.to_string(), *v)).collect(),
        }
    }

    /// Counts calls and fails range queries on one partition
    struct FlakyStore {
        inner: InMemoryStore,
        failing_pk: Option<String>,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl RecordStore for FlakyStore {
        async fn put_item(&self, item: &StoreItem) -> Result<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.inner.put_item(item).await
        }

        async fn query_range(&self, pk: &str, sk_from: i64, sk_to: i64) -> Result<Vec<StoreItem>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.failing_pk.as_deref() == Some(pk) {
                return Err(RollupError::Store {
                    message: format!("partition {pk} unavailable"),
                });
            }
            self.inner.query_range(pk, sk_from, sk_to).await
        }

        async fn batch_get(&self, keys: &[ItemKey]) -> Result<Vec<StoreItem>> {
            self.inner.batch_get(keys).await
        }
    }

    #[tokio::test]
    async fn averages_window_across_midnight() {
        let store = Arc::new(InMemoryStore::new());
        let now = Utc.with_ymd_and_hms(2024, 1, 2, 1, 0, 0).unwrap();
        let t = now.timestamp();

        // 23:30 on Jan 1 and 00:30 on Jan 2, both inside a 2h window
        store.put_item(&reading("2024#1#1", t - 5_400, &[("temp", 10.0)])).await.unwrap();
        store.put_item(&reading("2024#1#2", t - 1_800, &[("temp", 20.0), ("hum", 50.0)])).await.unwrap();
        // outside the window
        store.put_item(&reading("2024#1#1", t - 9_000, &[("temp", 99.0)])).await.unwrap();

        let use_case = AggregateUseCase::new(store.clone());
        let summary = use_case
            .run_at(&json!({ "period": "WEEK", "seconds": 7_200 }), now)
            .await
            .unwrap();

        assert!(summary.written);
        assert_eq!(summary.key, "AGG#WEEK#2024#1");
        assert_eq!(summary.timestamp, t - 7_200);
        assert_eq!(summary.buckets_scanned, 2);
        assert_eq!(summary.readings, 2);
        assert_eq!(summary.fields["temp"], 15.0);
        assert_eq!(summary.fields["hum"], 50.0);

        let stored = store.partition("AGG#WEEK#2024#1").unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].sk, t - 7_200);
        assert_eq!(stored[0].data, summary.fields);
    }

    #[tokio::test]
    async fn empty_window_writes_nothing() {
        let store = Arc::new(InMemoryStore::new());
        let now = Utc.with_ymd_and_hms(2024, 6, 15, 12, 0, 0).unwrap();

        let summary = AggregateUseCase::new(store.clone())
            .run_at(&json!({ "period": "MONTH", "seconds": 86_400 }), now)
            .await
            .unwrap();

        assert!(!summary.written);
        assert!(summary.fields.is_empty());
        assert_eq!(summary.key, "AGG#MONTH#2024#6");
        assert_eq!(store.item_count().unwrap(), 0);
    }

    #[tokio::test]
    async fn invalid_event_touches_no_store() {
        let store = Arc::new(FlakyStore {
            inner: InMemoryStore::new(),
            failing_pk: None,
            calls: AtomicUsize::new(0),
        });
        let use_case = AggregateUseCase::new(store.clone());

        for event in [json!({ "period": "DAY", "seconds": 60 }), json!({ "period": "YEAR" })] {
            let err = use_case.run(&event).await.unwrap_err();
            assert!(matches!(err, RollupError::Validation(_)));
        }
        assert_eq!(store.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn any_failed_bucket_aborts_without_writing() {
        let now = Utc.with_ymd_and_hms(2024, 3, 3, 12, 0, 0).unwrap();
        let store = Arc::new(FlakyStore {
            inner: InMemoryStore::new(),
            failing_pk: Some("2024#3#2".to_string()),
            calls: AtomicUsize::new(0),
        });
        store
            .inner
            .put_item(&reading("2024#3#3", now.timestamp() - 60, &[("v", 1.0)]))
            .await
            .unwrap();

        let err = AggregateUseCase::new(store.clone())
            .aggregate_window(RollupPeriod::Year, 3 * 86_400, now)
            .await
            .unwrap_err();

        assert!(matches!(err, RollupError::Store { .. }));
        assert!(store.inner.partition("AGG#YEAR#2024").unwrap().is_empty());
    }

    #[tokio::test]
    async fn oversized_window_is_rejected() {
        let store = Arc::new(InMemoryStore::new());
        let err = AggregateUseCase::new(store)
            .aggregate_window(RollupPeriod::Week, u64::MAX, Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, RollupError::Validation(_)));
    }
}
