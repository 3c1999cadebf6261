//! HTTP transport for the inference engine
//!
//! ```text
//! GET  /                    discovery document
//! GET  /api/v1/health       liveness and uptime
//! GET  /api/v1/model/info   model descriptor
//! POST /api/v1/analyze      threat analysis (X-API-Key)
//! ```

pub mod auth;
pub mod error;
pub mod handlers;

use crate::config::AppConfig;
use crate::metrics::ServiceMetrics;
use crate::models::inference::InferenceEngine;
use axum::{
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use std::time::Instant;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

pub use error::{AppError, AppResult};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<InferenceEngine>,
    pub metrics: Arc<ServiceMetrics>,
    pub config: Arc<AppConfig>,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(engine: Arc<InferenceEngine>, metrics: Arc<ServiceMetrics>, config: AppConfig) -> Self {
        Self {
            engine,
            metrics,
            config: Arc::new(config),
            started_at: Instant::now(),
        }
    }
}

/// Create the main router with all routes
pub fn create_router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/", get(handlers::root))
        .route("/api/v1/health", get(handlers::health))
        .route("/api/v1/model/info", get(handlers::model_info));

    let analysis_routes = Router::new()
        .route("/api/v1/analyze", post(handlers::analyze))
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            auth::require_api_key,
        ));

    Router::new()
        .merge(public_routes)
        .merge(analysis_routes)
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
