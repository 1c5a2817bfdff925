use serde::Serialize;

use crate::gateways::GatewayError;

/// Domain failures surfaced by the booking and payment services. Each
/// variant maps to a stable code at the HTTP boundary. Duplicate
/// confirmations are deliberately absent: replays are absorbed, not failed.
#[derive(Debug, thiserror::Error)]
pub enum BookingError {
    #[error("{0}")]
    Validation(String),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("not enough tickets available")]
    InsufficientInventory,

    #[error("invalid state transition: {0}")]
    InvalidStateTransition(String),

    #[error(transparent)]
    Gateway(#[from] GatewayError),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl BookingError {
    pub fn code(&self) -> &'static str {
        match self {
            BookingError::Validation(_) => "VALIDATION_ERROR",
            BookingError::NotFound(_) => "NOT_FOUND",
            BookingError::InsufficientInventory => "INSUFFICIENT_INVENTORY",
            BookingError::InvalidStateTransition(_) => "INVALID_STATE_TRANSITION",
            BookingError::Gateway(_) => "GATEWAY_ERROR",
            BookingError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorEnvelope {
    pub error: ErrorPayload,
}

#[derive(Debug, Serialize)]
pub struct ErrorPayload {
    pub code: String,
    pub message: String,
    pub details: Option<String>,
}

impl ErrorEnvelope {
    pub fn from_error(e: &BookingError) -> Self {
        ErrorEnvelope {
            error: ErrorPayload {
                code: e.code().to_string(),
                message: e.to_string(),
                details: None,
            },
        }
    }
}
