use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use booking_engine::cache::redis::RedisCache;
use booking_engine::config::AppConfig;
use booking_engine::gateways::paystack::PaystackGateway;
use booking_engine::notify::{HttpQrGenerator, WebhookNotifier};
use booking_engine::service::booking_service::BookingService;
use booking_engine::service::payment_service::PaymentService;
use booking_engine::store::postgres::PgStore;
use booking_engine::AppState;
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cfg = AppConfig::from_env();

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&cfg.database_url)
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;

    let store = Arc::new(PgStore { pool });
    let cache = Arc::new(RedisCache::new(&cfg.redis_url)?);
    let gateway = Arc::new(PaystackGateway {
        base_url: cfg.gateway_base_url.clone(),
        secret_key: cfg.gateway_secret_key.clone(),
        timeout_ms: cfg.gateway_timeout_ms,
        client: reqwest::Client::new(),
    });
    let notifier = Arc::new(WebhookNotifier {
        target_url: cfg.notifier_url.clone(),
        client: reqwest::Client::new(),
    });
    let qr = Arc::new(HttpQrGenerator {
        base_url: cfg.qr_renderer_url.clone(),
        client: reqwest::Client::new(),
    });

    let booking_service = BookingService {
        store: store.clone(),
        cache: cache.clone(),
        hold_ttl: chrono::Duration::minutes(cfg.hold_ttl_minutes),
        max_quantity_per_request: cfg.max_quantity_per_request,
        cache_ttl: std::time::Duration::from_secs(cfg.cache_ttl_secs),
    };
    let payment_service = PaymentService {
        store,
        gateway,
        notifier,
        qr,
        booking_service: booking_service.clone(),
        reuse_window: chrono::Duration::minutes(cfg.payment_reuse_minutes),
    };

    let state = AppState {
        booking_service,
        payment_service,
    };

    let app = Router::new()
        .route("/health", get(booking_engine::http::handlers::bookings::health))
        .route("/bookings", post(booking_engine::http::handlers::bookings::start_booking))
        .route(
            "/bookings/:booking_id/cancel",
            post(booking_engine::http::handlers::bookings::cancel_booking),
        )
        .route(
            "/bookings/reference/:reference",
            get(booking_engine::http::handlers::bookings::get_booking_by_reference),
        )
        .route(
            "/events/:event_id/availability",
            get(booking_engine::http::handlers::events::get_event_availability),
        )
        .route(
            "/payments/initialize",
            post(booking_engine::http::handlers::payments::initialize_payment),
        )
        .route(
            "/payments/webhook",
            post(booking_engine::http::handlers::payments::gateway_webhook),
        )
        .route(
            "/payments/:reference/verify",
            get(booking_engine::http::handlers::payments::verify_payment),
        )
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(&cfg.bind_addr).await?;
    tracing::info!("listening on {}", cfg.bind_addr);
    axum::serve(listener, app).await?;
    Ok(())
}
