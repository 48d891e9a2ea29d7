// Entrypoint use cases: ingestion, rollup job, range query

pub mod aggregate_use_case;
pub mod ingest_use_case;
pub mod query_use_case;

pub use aggregate_use_case::{AggregateEvent, AggregateSummary, AggregateUseCase};
pub use ingest_use_case::{IngestRequest, IngestResponse, IngestUseCase};
pub use query_use_case::{resolve_query, QueryRequest, QueryResponse};
