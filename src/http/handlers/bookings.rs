use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use uuid::Uuid;

use crate::http::error_response;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct StartBookingRequest {
    pub event_id: Uuid,
    pub user_id: Uuid,
    pub quantity: i32,
}

#[derive(Debug, Deserialize)]
pub struct CancelBookingRequest {
    pub actor_id: Uuid,
    #[serde(default)]
    pub reason: String,
}

pub async fn start_booking(
    State(state): State<AppState>,
    Json(req): Json<StartBookingRequest>,
) -> impl IntoResponse {
    match state
        .booking_service
        .start_booking(req.event_id, req.user_id, req.quantity)
        .await
    {
        Ok(created) => (axum::http::StatusCode::CREATED, Json(created)).into_response(),
        Err(e) => error_response(&e),
    }
}

pub async fn cancel_booking(
    State(state): State<AppState>,
    Path(booking_id): Path<Uuid>,
    Json(req): Json<CancelBookingRequest>,
) -> impl IntoResponse {
    match state
        .booking_service
        .cancel_booking(booking_id, req.actor_id, &req.reason)
        .await
    {
        Ok(cancelled) => (axum::http::StatusCode::OK, Json(cancelled)).into_response(),
        Err(e) => error_response(&e),
    }
}

pub async fn get_booking_by_reference(
    State(state): State<AppState>,
    Path(reference): Path<String>,
) -> impl IntoResponse {
    match state
        .booking_service
        .get_booking_by_reference(&reference)
        .await
    {
        Ok(found) => (axum::http::StatusCode::OK, Json(found)).into_response(),
        Err(e) => error_response(&e),
    }
}

pub async fn health() -> impl IntoResponse {
    (axum::http::StatusCode::OK, "ok")
}
