use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::Json;
use uuid::Uuid;

use crate::http::error_response;
use crate::AppState;

pub async fn get_event_availability(
    State(state): State<AppState>,
    Path(event_id): Path<Uuid>,
) -> impl IntoResponse {
    match state.booking_service.get_event_availability(event_id).await {
        Ok(availability) => (axum::http::StatusCode::OK, Json(availability)).into_response(),
        Err(e) => error_response(&e),
    }
}
