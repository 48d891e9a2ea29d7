//! Request validation for the three entrypoints.
//!
//! Each input is first checked against a JSON Schema so callers get every
//! violation at once, then decoded into its typed request struct. Unknown
//! top-level fields are accepted everywhere.

use crate::app::aggregate_use_case::AggregateEvent;
use crate::app::ingest_use_case::IngestRequest;
use crate::app::query_use_case::QueryRequest;
use crate::error::ValidationError;
use crate::period::Period;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use jsonschema::JSONSchema;
use once_cell::sync::Lazy;
use serde::de::DeserializeOwned;
use serde_json::{json, Map, Value};
use std::collections::HashMap;

static INGEST_SCHEMA: Lazy<JSONSchema> = Lazy::new(|| {
    compile(json!({
        "type": "object",
        "required": ["data"],
        "properties": {
            "data": {
                "type": "object",
                "additionalProperties": { "type": "number" }
            }
        }
    }))
});

static QUERY_SCHEMA: Lazy<JSONSchema> = Lazy::new(|| {
    compile(json!({
        "type": "object",
        "required": ["period", "from", "to"],
        "properties": {
            "period": { "enum": ["DAY", "WEEK", "MONTH", "YEAR"] },
            "from": { "type": "string" },
            "to": { "type": "string" }
        }
    }))
});

static AGGREGATE_SCHEMA: Lazy<JSONSchema> = Lazy::new(|| {
    compile(json!({
        "type": "object",
        "required": ["period", "seconds"],
        "properties": {
            "period": { "enum": ["WEEK", "MONTH", "YEAR"] },
            "seconds": { "type": "integer", "minimum": 0 }
        }
    }))
});

fn compile(schema: Value) -> JSONSchema {
    // Compiled schemas live for the whole process.
    let schema: &'static Value = Box::leak(Box::new(schema));
    JSONSchema::compile(schema).expect("built-in schema must compile")
}

fn check(schema: &JSONSchema, instance: &Value, message: &str) -> Result<(), ValidationError> {
    if let Err(errors) = schema.validate(instance) {
        let err = errors.fold(ValidationError::new(message), |err, e| {
            let path = e.instance_path.to_string();
            let path = if path.is_empty() { "/".to_string() } else { path };
            err.with_detail(path, e.to_string())
        });
        return Err(err);
    }
    Ok(())
}

fn decode<T: DeserializeOwned>(instance: Value, message: &str) -> Result<T, ValidationError> {
    serde_json::from_value(instance)
        .map_err(|e| ValidationError::new(message).with_detail("/", e.to_string()))
}

/// Parse a raw request body as JSON
pub fn parse_json_body(body: &[u8]) -> Result<Value, ValidationError> {
    serde_json::from_slice(body).map_err(|e| {
        ValidationError::new("request body is not valid JSON").with_detail("/", e.to_string())
    })
}

pub fn ingest_request(body: &Value) -> Result<IngestRequest, ValidationError> {
    const MESSAGE: &str = "invalid ingestion request";
    check(&INGEST_SCHEMA, body, MESSAGE)?;
    decode(body.clone(), MESSAGE)
}

pub fn aggregate_event(event: &Value) -> Result<AggregateEvent, ValidationError> {
    const MESSAGE: &str = "invalid aggregation event";
    check(&AGGREGATE_SCHEMA, event, MESSAGE)?;
    decode(event.clone(), MESSAGE)
}

pub fn query_request(params: &HashMap<String, String>) -> Result<QueryRequest, ValidationError> {
    const MESSAGE: &str = "invalid query parameters";
    let instance = Value::Object(
        params
            .iter()
            .map(|(k, v)| (k.clone(), Value::String(v.clone())))
            .collect::<Map<String, Value>>(),
    );
    check(&QUERY_SCHEMA, &instance, MESSAGE)?;

    let field = |name: &str| params.get(name).map(String::as_str).unwrap_or_default();
    let period: Period = field("period")
        .parse()
        .map_err(|e| ValidationError::new(MESSAGE).with_detail("/period", format!("{e}")))?;

    let mut err = ValidationError::new(MESSAGE);
    let from = parse_iso_date(field("from"));
    let to = parse_iso_date(field("to"));
    if from.is_none() {
        err = err.with_detail("/from", format!("\"{}\" is not an ISO 8601 date", field("from")));
    }
    if to.is_none() {
        err = err.with_detail("/to", format!("\"{}\" is not an ISO 8601 date", field("to")));
    }
    match (from, to) {
        (Some(from), Some(to)) => Ok(QueryRequest { period, from, to }),
        _ => Err(err),
    }
}

/// Calendar date of an ISO 8601 date or date-time. Date-times with an offset
/// are converted to UTC first; date-times without one are taken as UTC.
pub fn parse_iso_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        return Some(date);
    }
    if let Ok(instant) = DateTime::parse_from_rfc3339(value) {
        return Some(instant.with_timezone(&Utc).date_naive());
    }
    NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M"))
        .map(|dt| dt.date())
        .ok()
}
