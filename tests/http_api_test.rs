use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use chrono::{TimeZone, Utc};
use metric_rollup::bucket::day_bucket_key;
use metric_rollup::server::{create_server, AppState};
use metric_rollup::storage::{InMemoryStore, RecordStore};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

fn app(store: Arc<InMemoryStore>) -> Router {
    create_server(AppState { store })
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Option<String>, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let content_type = response
        .headers()
        .get(header::CONTENT_TYPE)
        .map(|v| v.to_str().unwrap().to_string());
    let bytes = hyper::body::to_bytes(response.into_body()).await.unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, content_type, body)
}

fn post(body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/data")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

#[tokio::test]
async fn posted_reading_is_stored_under_its_day_bucket() {
    let store = Arc::new(InMemoryStore::new());

    let (status, content_type, body) = send(
        app(store.clone()),
        post(r#"{"data": {"temp": 21.5, "hum": 40}, "device": "porch"}"#),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(content_type.as_deref(), Some("application/json"));
    assert_eq!(body["data"], json!({ "hum": 40.0, "temp": 21.5 }));

    let timestamp = body["timestamp"].as_i64().unwrap();
    let key = day_bucket_key(Utc.timestamp_opt(timestamp, 0).unwrap());
    let items = store.query_range(&key, timestamp, timestamp).await.unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].data["temp"], 21.5);
    assert_eq!(items[0].data["hum"], 40.0);
}

#[tokio::test]
async fn non_numeric_field_is_rejected_with_400() {
    let store = Arc::new(InMemoryStore::new());

    let (status, content_type, body) =
        send(app(store.clone()), post(r#"{"data": {"temp": "warm"}}"#)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(content_type.as_deref(), Some("application/json"));
    assert_eq!(body["message"], "invalid ingestion request");
    assert_eq!(body["details"][0]["path"], "/data/temp");
    assert_eq!(store.item_count().unwrap(), 0);
}

#[tokio::test]
async fn malformed_json_is_rejected_with_400() {
    let store = Arc::new(InMemoryStore::new());
    let (status, _, body) = send(app(store), post("{not json")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "request body is not valid JSON");
}

#[tokio::test]
async fn query_resolves_covering_keys() {
    let store = Arc::new(InMemoryStore::new());

    let (status, _, body) = send(
        app(store),
        get("/data?period=MONTH&from=2020-11-15&to=2021-02-10"),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["period"], "MONTH");
    assert_eq!(body["from"], "2020-11-15");
    assert_eq!(body["keys"], json!(["2020-11", "2020-12", "2021-1", "2021-2"]));
}

#[tokio::test]
async fn query_with_bad_parameters_is_rejected() {
    let store = Arc::new(InMemoryStore::new());

    let (status, _, body) = send(
        app(store.clone()),
        get("/data?period=HOUR&from=2020-01-01&to=2020-01-02"),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["details"][0]["path"], "/period");

    let (status, _, body) = send(app(store), get("/data?period=DAY&from=2020-01-01&to=soon")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["details"][0]["path"], "/to");
}

#[tokio::test]
async fn health_reports_healthy() {
    let (status, _, body) = send(app(Arc::new(InMemoryStore::new())), get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
}
