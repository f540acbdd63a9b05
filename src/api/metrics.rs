//! Prometheus metrics endpoint.

use axum::{extract::State, http::header, response::IntoResponse};
use chrono::Utc;

use crate::error::{AppError, Result};
use crate::metrics;
use crate::server::AppState;

/// GET /metrics - Prometheus metrics endpoint
pub async fn prometheus_metrics(State(state): State<AppState>) -> Result<impl IntoResponse> {
    update_metrics_from_state(&state);

    let output = metrics::encode_metrics().map_err(|e| {
        tracing::error!(error = %e, "Failed to encode Prometheus metrics");
        AppError::Internal(format!("Failed to encode metrics: {}", e))
    })?;

    Ok((
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4; charset=utf-8")],
        output,
    ))
}

/// Refresh store gauges from AppState
fn update_metrics_from_state(state: &AppState) {
    metrics::MAILS_STORED.set(state.mails.count() as i64);
    metrics::MAILS_DUE.set(state.mails.due_for_delivery(Utc::now()).len() as i64);
    metrics::ENTITIES_REGISTERED.set(state.registry.count() as i64);
    metrics::TEMPLATES_STORED.set(state.templates.count() as i64);
}
