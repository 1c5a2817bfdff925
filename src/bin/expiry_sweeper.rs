use std::sync::Arc;

use anyhow::Result;
use booking_engine::cache::redis::RedisCache;
use booking_engine::config::AppConfig;
use booking_engine::service::booking_service::BookingService;
use booking_engine::store::postgres::PgStore;
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cfg = AppConfig::from_env();
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&cfg.database_url)
        .await?;

    let service = BookingService {
        store: Arc::new(PgStore { pool }),
        cache: Arc::new(RedisCache::new(&cfg.redis_url)?),
        hold_ttl: chrono::Duration::minutes(cfg.hold_ttl_minutes),
        max_quantity_per_request: cfg.max_quantity_per_request,
        cache_ttl: std::time::Duration::from_secs(cfg.cache_ttl_secs),
    };

    loop {
        match service.expire_due(cfg.sweep_batch_size).await {
            Ok(0) => {}
            Ok(n) => tracing::info!(expired = n, "expiry sweep released stale holds"),
            Err(e) => tracing::error!(error = %e, "expiry sweep failed"),
        }

        tokio::time::sleep(std::time::Duration::from_secs(cfg.sweep_interval_secs)).await;
    }
}
