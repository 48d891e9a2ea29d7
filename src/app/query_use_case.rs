use crate::error::{Result, RollupError};
use crate::period::Period;
use crate::resolver::resolve;
use crate::validation;
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::HashMap;
use tracing::debug;

/// Validated range query
#[derive(Debug, Clone, PartialEq)]
pub struct QueryRequest {
    pub period: Period,
    pub from: NaiveDate,
    pub to: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryResponse {
    pub period: Period,
    pub from: NaiveDate,
    pub to: NaiveDate,
    /// Partition keys covering `from..=to`, in calendar order
    pub keys: Vec<String>,
}

/// Resolve the partition keys a range read at `period` granularity has to touch.
///
/// Fetching and shaping the data behind those keys is left to the caller.
pub fn resolve_query(params: &HashMap<String, String>) -> Result<QueryResponse> {
    let request = validation::query_request(params).map_err(|e| {
        crate::metrics::validation_failed("query");
        RollupError::Validation(e)
    })?;

    let keys = resolve(request.period, request.from, request.to);
    debug!(period = %request.period, count = keys.len(), "Resolved keys {:?}", keys);

    Ok(QueryResponse {
        period: request.period,
        from: request.from,
        to: request.to,
        keys,
    })
}
