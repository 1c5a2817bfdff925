use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use uuid::Uuid;

use crate::domain::payment::ConfirmOrigin;
use crate::http::error_response;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct InitializePaymentRequest {
    pub booking_id: Uuid,
    pub callback_url: String,
}

/// Shape of the gateway push we care about. The transport signature has
/// been validated upstream; the claimed status is deliberately ignored and
/// re-verified against the gateway inside `confirm`.
#[derive(Debug, Deserialize)]
pub struct GatewayWebhook {
    pub data: GatewayWebhookData,
}

#[derive(Debug, Deserialize)]
pub struct GatewayWebhookData {
    pub reference: String,
}

pub async fn initialize_payment(
    State(state): State<AppState>,
    Json(req): Json<InitializePaymentRequest>,
) -> impl IntoResponse {
    match state
        .payment_service
        .initialize_payment(req.booking_id, &req.callback_url)
        .await
    {
        Ok(initialized) => (axum::http::StatusCode::OK, Json(initialized)).into_response(),
        Err(e) => error_response(&e),
    }
}

pub async fn gateway_webhook(
    State(state): State<AppState>,
    Json(payload): Json<GatewayWebhook>,
) -> impl IntoResponse {
    match state
        .payment_service
        .confirm(&payload.data.reference, ConfirmOrigin::Webhook)
        .await
    {
        Ok(outcome) => (axum::http::StatusCode::OK, Json(outcome)).into_response(),
        Err(e) => error_response(&e),
    }
}

pub async fn verify_payment(
    State(state): State<AppState>,
    Path(reference): Path<String>,
) -> impl IntoResponse {
    match state
        .payment_service
        .confirm(&reference, ConfirmOrigin::Poll)
        .await
    {
        Ok(outcome) => (axum::http::StatusCode::OK, Json(outcome)).into_response(),
        Err(e) => error_response(&e),
    }
}
