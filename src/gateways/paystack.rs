use reqwest::StatusCode;
use serde_json::json;

use crate::gateways::{
    GatewayError, GatewayPaymentStatus, InitializeRequest, InitializedPayment, PaymentGateway,
    VerifiedPayment,
};

pub struct PaystackGateway {
    pub base_url: String,
    pub secret_key: String,
    pub timeout_ms: u64,
    pub client: reqwest::Client,
}

impl PaystackGateway {
    fn map_err(e: reqwest::Error) -> GatewayError {
        if e.is_timeout() {
            GatewayError::Timeout
        } else {
            GatewayError::Transport(e.to_string())
        }
    }
}

#[async_trait::async_trait]
impl PaymentGateway for PaystackGateway {
    fn name(&self) -> &'static str {
        "paystack"
    }

    async fn initialize(
        &self,
        request: InitializeRequest,
    ) -> Result<InitializedPayment, GatewayError> {
        let url = format!("{}/transaction/initialize", self.base_url);
        let body = json!({
            "amount": request.amount_minor,
            "reference": request.reference,
            "callback_url": request.callback_url,
        });

        let resp = self
            .client
            .post(url)
            .bearer_auth(&self.secret_key)
            .json(&body)
            .timeout(std::time::Duration::from_millis(self.timeout_ms))
            .send()
            .await
            .map_err(Self::map_err)?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(GatewayError::Protocol(format!(
                "initialize returned HTTP {}: {}",
                status.as_u16(),
                body.chars().take(200).collect::<String>()
            )));
        }

        let v: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| GatewayError::Protocol(e.to_string()))?;
        let data = &v["data"];
        let authorization_url = data["authorization_url"]
            .as_str()
            .ok_or_else(|| GatewayError::Protocol("missing authorization_url".to_string()))?
            .to_string();
        let gateway_reference = data["access_code"]
            .as_str()
            .unwrap_or(&request.reference)
            .to_string();

        Ok(InitializedPayment {
            authorization_url,
            gateway_reference,
        })
    }

    async fn verify(&self, reference: &str) -> Result<VerifiedPayment, GatewayError> {
        let url = format!("{}/transaction/verify/{}", self.base_url, reference);

        let resp = self
            .client
            .get(url)
            .bearer_auth(&self.secret_key)
            .timeout(std::time::Duration::from_millis(self.timeout_ms))
            .send()
            .await
            .map_err(Self::map_err)?;

        let status = resp.status();
        if status == StatusCode::NOT_FOUND {
            return Err(GatewayError::Protocol(format!(
                "unknown transaction reference {reference}"
            )));
        }
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(GatewayError::Protocol(format!(
                "verify returned HTTP {}: {}",
                status.as_u16(),
                body.chars().take(200).collect::<String>()
            )));
        }

        let v: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| GatewayError::Protocol(e.to_string()))?;
        let data = &v["data"];
        let outcome = match data["status"].as_str() {
            Some("success") => GatewayPaymentStatus::Successful,
            Some("failed") | Some("abandoned") | Some("reversed") => GatewayPaymentStatus::Failed,
            _ => GatewayPaymentStatus::Pending,
        };

        Ok(VerifiedPayment {
            status: outcome,
            amount_minor: data["amount"].as_i64().unwrap_or(0),
            paid_at: data["paid_at"]
                .as_str()
                .and_then(|s| chrono::DateTime::parse_from_rfc3339(s).ok())
                .map(|t| t.with_timezone(&chrono::Utc)),
            gateway_reference: data["id"]
                .as_i64()
                .map(|id| id.to_string())
                .unwrap_or_else(|| reference.to_string()),
        })
    }
}
