use crate::gateways::signature;
use crate::gateways::{GatewayOrder, GatewayOrderRequest, PaymentGateway};
use anyhow::{anyhow, Result};
use serde_json::json;

pub struct RazorpayGateway {
    pub base_url: String,
    pub key_id: String,
    pub key_secret: String,
    pub timeout_ms: u64,
    pub client: reqwest::Client,
}

#[async_trait::async_trait]
impl PaymentGateway for RazorpayGateway {
    fn name(&self) -> &'static str {
        "razorpay"
    }

    async fn create_order(&self, request: GatewayOrderRequest) -> Result<GatewayOrder> {
        let order_url = format!("{}/v1/orders", self.base_url.trim_end_matches('/'));
        let body = json!({
            "amount": request.amount_minor,
            "currency": request.currency,
            "receipt": request.receipt,
            "payment_capture": 1,
            "notes": request.notes,
        });

        let resp = self
            .client
            .post(order_url)
            .basic_auth(&self.key_id, Some(&self.key_secret))
            .json(&body)
            .timeout(std::time::Duration::from_millis(self.timeout_ms))
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    anyhow!("razorpay order creation timed out after {}ms", self.timeout_ms)
                } else {
                    anyhow!("razorpay order creation failed: {e}")
                }
            })?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(anyhow!(
                "razorpay returned HTTP {}: {}",
                status.as_u16(),
                body.chars().take(200).collect::<String>()
            ));
        }

        let order: GatewayOrder = resp.json().await?;
        tracing::info!(gateway_order_id = %order.id, amount = order.amount, "razorpay order created");
        Ok(order)
    }

    fn verify_payment_signature(&self, order_id: &str, payment_id: &str, signature: &str) -> bool {
        signature::verify_checkout(&self.key_secret, order_id, payment_id, signature)
    }
}
