use serde::{Deserialize, Serialize};

pub mod mock;
pub mod paystack;

#[derive(Debug, Clone)]
pub struct InitializeRequest {
    pub amount_minor: i64,
    pub reference: String,
    pub callback_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InitializedPayment {
    pub authorization_url: String,
    pub gateway_reference: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GatewayPaymentStatus {
    Successful,
    Failed,
    Pending,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifiedPayment {
    pub status: GatewayPaymentStatus,
    pub amount_minor: i64,
    pub paid_at: Option<chrono::DateTime<chrono::Utc>>,
    pub gateway_reference: String,
}

/// Transport-level failures. Fail closed: none of these ever stands in for
/// a payment outcome, and no local state is mutated when one occurs.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("gateway timed out")]
    Timeout,
    #[error("gateway transport error: {0}")]
    Transport(String),
    #[error("gateway protocol error: {0}")]
    Protocol(String),
}

#[async_trait::async_trait]
pub trait PaymentGateway: Send + Sync {
    fn name(&self) -> &'static str;

    async fn initialize(
        &self,
        request: InitializeRequest,
    ) -> Result<InitializedPayment, GatewayError>;

    async fn verify(&self, reference: &str) -> Result<VerifiedPayment, GatewayError>;
}
