pub mod cache;
pub mod config;
pub mod domain {
    pub mod booking;
    pub mod event;
    pub mod payment;
}
pub mod error;
pub mod gateways;
pub mod http {
    pub mod handlers {
        pub mod bookings;
        pub mod events;
        pub mod payments;
    }

    use axum::response::{IntoResponse, Response};
    use axum::Json;

    use crate::error::{BookingError, ErrorEnvelope};

    pub fn error_response(e: &BookingError) -> Response {
        let status = match e {
            BookingError::Validation(_) => axum::http::StatusCode::BAD_REQUEST,
            BookingError::NotFound(_) => axum::http::StatusCode::NOT_FOUND,
            BookingError::InsufficientInventory => axum::http::StatusCode::CONFLICT,
            BookingError::InvalidStateTransition(_) => {
                axum::http::StatusCode::UNPROCESSABLE_ENTITY
            }
            BookingError::Gateway(_) => axum::http::StatusCode::BAD_GATEWAY,
            BookingError::Internal(_) => axum::http::StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(ErrorEnvelope::from_error(e))).into_response()
    }
}
pub mod notify;
pub mod service {
    pub mod booking_service;
    pub mod payment_service;
}
pub mod store;

#[derive(Clone)]
pub struct AppState {
    pub booking_service: service::booking_service::BookingService,
    pub payment_service: service::payment_service::PaymentService,
}
