use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::gateways::{
    GatewayError, GatewayPaymentStatus, InitializeRequest, InitializedPayment, PaymentGateway,
    VerifiedPayment,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockBehavior {
    AlwaysSuccessful,
    AlwaysFailed,
    StillPending,
    AlwaysTimeout,
}

/// Scripted gateway for tests: verify reports the configured behavior and
/// echoes back the amount recorded at initialize time.
pub struct MockGateway {
    pub behavior: RwLock<MockBehavior>,
    amounts: RwLock<std::collections::HashMap<String, i64>>,
    pub initialize_calls: AtomicUsize,
    pub verify_calls: AtomicUsize,
}

impl MockGateway {
    pub fn new(behavior: MockBehavior) -> Arc<Self> {
        Arc::new(Self {
            behavior: RwLock::new(behavior),
            amounts: RwLock::new(std::collections::HashMap::new()),
            initialize_calls: AtomicUsize::new(0),
            verify_calls: AtomicUsize::new(0),
        })
    }

    pub async fn set_behavior(&self, behavior: MockBehavior) {
        *self.behavior.write().await = behavior;
    }

    /// Registers an amount for a reference the mock never saw initialize
    /// for, or overrides one to simulate an amount mismatch.
    pub async fn script_amount(&self, reference: &str, amount_minor: i64) {
        self.amounts
            .write()
            .await
            .insert(reference.to_string(), amount_minor);
    }
}

#[async_trait::async_trait]
impl PaymentGateway for MockGateway {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn initialize(
        &self,
        request: InitializeRequest,
    ) -> Result<InitializedPayment, GatewayError> {
        self.initialize_calls.fetch_add(1, Ordering::SeqCst);
        if *self.behavior.read().await == MockBehavior::AlwaysTimeout {
            return Err(GatewayError::Timeout);
        }
        self.amounts
            .write()
            .await
            .entry(request.reference.clone())
            .or_insert(request.amount_minor);
        Ok(InitializedPayment {
            authorization_url: format!("https://mock.gateway/pay/{}", request.reference),
            gateway_reference: format!("mock_{}", request.reference),
        })
    }

    async fn verify(&self, reference: &str) -> Result<VerifiedPayment, GatewayError> {
        self.verify_calls.fetch_add(1, Ordering::SeqCst);
        let behavior = *self.behavior.read().await;
        let status = match behavior {
            MockBehavior::AlwaysSuccessful => GatewayPaymentStatus::Successful,
            MockBehavior::AlwaysFailed => GatewayPaymentStatus::Failed,
            MockBehavior::StillPending => GatewayPaymentStatus::Pending,
            MockBehavior::AlwaysTimeout => return Err(GatewayError::Timeout),
        };
        let amount_minor = self
            .amounts
            .read()
            .await
            .get(reference)
            .copied()
            .unwrap_or(0);
        Ok(VerifiedPayment {
            status,
            amount_minor,
            paid_at: match status {
                GatewayPaymentStatus::Successful => Some(chrono::Utc::now()),
                _ => None,
            },
            gateway_reference: format!("mock_{reference}"),
        })
    }
}
