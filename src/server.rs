// Serving surface for the content store: stored references become
// servable URLs under /local-store.

use crate::downloader::store::{ImageStore, StoreStats};
use crate::downloader::LOCAL_ROUTE;
use crate::error::Result;
use axum::{extract::State, routing::get, Json, Router};
use std::sync::Arc;
use tower_http::{services::ServeDir, trace::TraceLayer};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<ImageStore>,
}

/// Create the router: health, store statistics, and the static store route
pub fn create_router(state: AppState) -> Router {
    let store_root = state.store.root().to_path_buf();

    Router::new()
        .route("/health", get(health))
        .route("/stats", get(get_stats))
        .with_state(state)
        .nest_service(LOCAL_ROUTE, ServeDir::new(store_root))
        .layer(TraceLayer::new_for_http())
}

async fn health() -> &'static str {
    "OK"
}

async fn get_stats(State(state): State<AppState>) -> Result<Json<StoreStats>> {
    let stats = state.store.stats().await?;
    Ok(Json(stats))
}
