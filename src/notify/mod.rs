use anyhow::Result;
use base64::Engine;
use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize)]
pub struct BookingConfirmedNote {
    pub booking_id: Uuid,
    pub booking_reference: String,
    pub user_id: Uuid,
    pub event_id: Uuid,
    pub quantity: i32,
    pub total_amount_minor: i64,
    pub payment_reference: String,
    pub confirmed_at: chrono::DateTime<chrono::Utc>,
    pub qr_png_base64: Option<String>,
}

/// Fire-and-forget confirmation dispatch. A failure here is logged by the
/// caller and never affects booking or payment state.
#[async_trait::async_trait]
pub trait Notifier: Send + Sync {
    async fn booking_confirmed(&self, note: BookingConfirmedNote) -> Result<()>;
}

#[async_trait::async_trait]
pub trait QrGenerator: Send + Sync {
    async fn generate(&self, booking_reference: &str) -> Result<Vec<u8>>;
}

#[derive(Clone)]
pub struct WebhookNotifier {
    pub target_url: String,
    pub client: reqwest::Client,
}

#[async_trait::async_trait]
impl Notifier for WebhookNotifier {
    async fn booking_confirmed(&self, note: BookingConfirmedNote) -> Result<()> {
        self.client
            .post(&self.target_url)
            .header("X-Event-Type", "booking.confirmed")
            .json(&note)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}

/// Fetches the rendered ticket QR from the configured renderer service.
#[derive(Clone)]
pub struct HttpQrGenerator {
    pub base_url: String,
    pub client: reqwest::Client,
}

#[async_trait::async_trait]
impl QrGenerator for HttpQrGenerator {
    async fn generate(&self, booking_reference: &str) -> Result<Vec<u8>> {
        let url = format!("{}/qr/{}", self.base_url, booking_reference);
        let bytes = self
            .client
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .bytes()
            .await?;
        Ok(bytes.to_vec())
    }
}

pub fn encode_qr(bytes: &[u8]) -> String {
    base64::engine::general_purpose::STANDARD.encode(bytes)
}
