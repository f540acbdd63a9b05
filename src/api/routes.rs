use axum::{routing::get, Router};

use crate::server::AppState;

use super::health::health;
use super::metrics::prometheus_metrics;
use super::tracking::track_open;

pub fn api_routes() -> Router<AppState> {
    Router::new()
        // Health & metrics
        .route("/health", get(health))
        .route("/metrics", get(prometheus_metrics))
        // Open tracking pixel
        .route("/track/{id}", get(track_open))
}
