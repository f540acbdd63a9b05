//! Health check endpoint.

use axum::{extract::State, Json};
use chrono::Utc;
use serde::Serialize;

use crate::mail::MailErrorCode;
use crate::server::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
    pub mails: MailHealthResponse,
    pub entities: usize,
    pub templates: usize,
}

#[derive(Debug, Serialize)]
pub struct MailHealthResponse {
    pub total: usize,
    pub due: usize,
    pub transport_errors: usize,
}

pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let mails = &state.mails;

    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
        mails: MailHealthResponse {
            total: mails.count(),
            due: mails.due_for_delivery(Utc::now()).len(),
            transport_errors: mails.with_error(MailErrorCode::TransportError).len(),
        },
        entities: state.registry.count(),
        templates: state.templates.count(),
    })
}
