//! Open tracking endpoint.

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::header,
    response::IntoResponse,
};
use uuid::Uuid;

use crate::server::AppState;

/// 1x1 transparent GIF
pub static TRACKING_PIXEL: [u8; 43] = [
    0x47, 0x49, 0x46, 0x38, 0x39, 0x61, 0x01, 0x00, 0x01, 0x00, 0x80, 0x00, 0x00, 0x00, 0x00,
    0x00, 0xff, 0xff, 0xff, 0x21, 0xf9, 0x04, 0x01, 0x00, 0x00, 0x00, 0x00, 0x2c, 0x00, 0x00,
    0x00, 0x00, 0x01, 0x00, 0x01, 0x00, 0x00, 0x02, 0x02, 0x44, 0x01, 0x00, 0x3b,
];

/// GET /track/{id} - stamp the open and answer with the pixel.
///
/// The pixel is served for any path, known mail or not, so mail clients
/// never show a broken image.
pub async fn track_open(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    match Uuid::parse_str(&id) {
        Ok(mail_id) => {
            state.tracker.record_open(mail_id);
        }
        Err(_) => tracing::debug!(id = %id, "Tracking request with malformed mail id"),
    }

    (
        [
            (header::CONTENT_TYPE, "image/gif"),
            (header::CACHE_CONTROL, "no-store"),
        ],
        Bytes::from_static(&TRACKING_PIXEL),
    )
}
