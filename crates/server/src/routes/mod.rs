pub mod download;
pub mod health;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};

use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/download", post(download::download))
        .route("/health", get(health::health))
}
