//! Read-only HTTP endpoint over the latest snapshot
//!
//! `GET /products` loads the snapshot on every request, so a scrape that
//! refreshes the file is visible without restarting the server.

use crate::output::{filter_products, load_snapshot, snapshot_generated_at, ProductQuery};
use crate::product::Product;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;

/// Snapshot location used when none is configured
pub const DEFAULT_DATA_PATH: &str = "outputs/processed/latest_products.json";

/// Environment variable overriding the snapshot location
pub const DATA_PATH_ENV: &str = "ECOMSCRAPE_DATA_PATH";

/// State shared with the handlers
#[derive(Debug, Clone)]
pub struct ServerState {
    pub data_path: Arc<PathBuf>,
}

impl ServerState {
    pub fn new(data_path: impl Into<PathBuf>) -> Self {
        Self {
            data_path: Arc::new(data_path.into()),
        }
    }
}

/// Body of `GET /products`
#[derive(Debug, Serialize)]
pub struct ProductsResponse {
    pub products: Vec<Product>,
    pub count: usize,

    /// Snapshot modification time, null when there is no snapshot
    pub generated_at: Option<String>,
    pub data_path: String,
}

/// Snapshot read failure, returned as 500 with a `detail` message
#[derive(Debug)]
pub struct ApiError {
    pub detail: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(serde_json::json!({ "detail": self.detail })),
        )
            .into_response()
    }
}

/// Build the axum router for the query endpoint.
pub fn router(state: ServerState) -> Router {
    Router::new()
        .route("/products", get(list_products))
        .with_state(state)
}

async fn list_products(
    State(state): State<ServerState>,
    Query(query): Query<ProductQuery>,
) -> Result<Json<ProductsResponse>, ApiError> {
    let path = state.data_path.as_path();

    let products = load_snapshot(path).map_err(|e| {
        tracing::error!(path = %path.display(), error = %e, "Failed to read snapshot");
        ApiError {
            detail: format!("Failed to read data: {}", e),
        }
    })?;

    let filtered = filter_products(&products, &query);
    tracing::debug!(
        total = products.len(),
        matched = filtered.len(),
        "Served products"
    );

    Ok(Json(ProductsResponse {
        count: filtered.len(),
        products: filtered,
        generated_at: snapshot_generated_at(path),
        data_path: path.display().to_string(),
    }))
}

/// Serves the query endpoint until the process is stopped
pub async fn serve(addr: &str, data_path: PathBuf) -> std::io::Result<()> {
    let app = router(ServerState::new(data_path.clone()));

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(
        "Serving {} on http://{}/products",
        data_path.display(),
        listener.local_addr()?
    );

    axum::serve(listener, app).await
}
