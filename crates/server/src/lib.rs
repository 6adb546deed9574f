pub mod config;
pub mod error;
pub mod logging;
pub mod routes;
pub mod workspace;

pub use config::Config;
pub use error::{ApiError, Result};

use std::sync::Arc;

use axum::Router;
use axum::http::{Method, header};
use qiitadl_core::{Fetcher, PipelineConfig};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

/// Read-only state shared by every request.
pub struct AppState {
    pub config: Config,
    pub fetcher: Fetcher,
    pub pipeline: PipelineConfig,
}

impl AppState {
    pub fn new(config: Config) -> qiitadl_core::Result<Self> {
        let fetcher = Fetcher::new(config.fetch_config())?;
        let pipeline = config.pipeline_config();
        Ok(Self { config, fetcher, pipeline })
    }
}

fn build_cors(origins: &str) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any)
        .expose_headers([header::CONTENT_DISPOSITION]);

    if origins.is_empty() {
        cors.allow_origin(Any)
    } else {
        let origins: Vec<_> = origins.split(',').filter_map(|s| s.trim().parse().ok()).collect();
        cors.allow_origin(origins)
    }
}

pub fn build_app(state: Arc<AppState>) -> Router {
    let cors = build_cors(&state.config.cors_origins);

    routes::routes()
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
