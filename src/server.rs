use crate::app::{resolve_query, IngestResponse, IngestUseCase, QueryResponse};
use crate::error::RollupError;
use crate::storage::RecordStore;
use crate::validation;
use axum::{
    body::Bytes,
    extract::{Query, State},
    http::{Method, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use hyper::Server;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn RecordStore>,
}

impl IntoResponse for RollupError {
    fn into_response(self) -> Response {
        match self {
            RollupError::Validation(err) => (StatusCode::BAD_REQUEST, Json(err)).into_response(),
            other => {
                error!("Request failed: {}", other);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(serde_json::json!({ "message": other.to_string() })),
                )
                    .into_response()
            }
        }
    }
}

/// Health check endpoint
async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "metric-rollup",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Ingest one reading from a `{ "data": { name: number } }` body
async fn post_data(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<IngestResponse>, RollupError> {
    let body = validation::parse_json_body(&body).map_err(|e| {
        crate::metrics::validation_failed("ingest");
        RollupError::Validation(e)
    })?;
    let response = IngestUseCase::new(state.store).ingest(&body).await?;
    Ok(Json(response))
}

/// Resolve the keys covering `?period=&from=&to=`
async fn get_data(
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<QueryResponse>, RollupError> {
    Ok(Json(resolve_query(&params)?))
}

pub fn create_server(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/data", get(get_data).post(post_data))
        .layer(ServiceBuilder::new().layer(cors))
        .with_state(state)
}

/// Start the HTTP server on `addr`
pub async fn start_server(state: AppState, addr: SocketAddr) -> anyhow::Result<()> {
    let app = create_server(state);

    info!("HTTP server listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    Server::bind(&addr)
        .serve(app.into_make_service())
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutdown signal received");
        })
        .await?;

    Ok(())
}
