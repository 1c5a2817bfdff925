use anyhow::Result;
use std::time::Duration;

pub mod memory;
pub mod redis;

/// Best-effort read-acceleration store. Never authoritative: the record
/// store wins on any divergence. Invalidation is issued only after the
/// mutation committed, and its failure is logged, never propagated.
#[async_trait::async_trait]
pub trait Cache: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>>;
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<()>;
    async fn delete(&self, key: &str) -> Result<()>;
    async fn delete_by_prefix(&self, prefix: &str) -> Result<()>;
}

pub fn event_availability_key(event_id: uuid::Uuid) -> String {
    format!("event:avail:{event_id}")
}

pub fn booking_reference_key(reference: &str) -> String {
    format!("booking:ref:{reference}")
}

pub fn user_bookings_prefix(user_id: uuid::Uuid) -> String {
    format!("bookings:user:{user_id}:")
}

/// Fire-and-forget invalidation helper used after committed mutations.
pub async fn invalidate(cache: &dyn Cache, keys: &[String], prefixes: &[String]) {
    for key in keys {
        if let Err(e) = cache.delete(key).await {
            tracing::warn!(key = %key, error = %e, "cache invalidation failed");
        }
    }
    for prefix in prefixes {
        if let Err(e) = cache.delete_by_prefix(prefix).await {
            tracing::warn!(prefix = %prefix, error = %e, "cache invalidation failed");
        }
    }
}
