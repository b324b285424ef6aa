use crate::gateways::signature;
use crate::gateways::{GatewayOrder, GatewayOrderRequest, PaymentGateway};
use anyhow::{bail, Result};
use std::sync::Mutex;

/// Offline stand-in for Razorpay used when no API keys are configured.
pub struct MockGateway {
    pub key_secret: String,
    pub behavior: String,
    pub created: Mutex<Vec<GatewayOrder>>,
}

impl MockGateway {
    pub fn new(key_secret: impl Into<String>, behavior: impl Into<String>) -> Self {
        Self {
            key_secret: key_secret.into(),
            behavior: behavior.into(),
            created: Mutex::new(Vec::new()),
        }
    }

    pub fn created_orders(&self) -> Vec<GatewayOrder> {
        self.created.lock().map(|v| v.clone()).unwrap_or_default()
    }
}

#[async_trait::async_trait]
impl PaymentGateway for MockGateway {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn create_order(&self, request: GatewayOrderRequest) -> Result<GatewayOrder> {
        if self.behavior == "ALWAYS_FAILURE" {
            bail!("mock gateway declined order creation");
        }
        let order = GatewayOrder {
            id: format!("order_mock_{}", uuid::Uuid::new_v4().simple()),
            amount: request.amount_minor,
            currency: request.currency,
            receipt: request.receipt,
            status: Some("created".to_string()),
        };
        if let Ok(mut created) = self.created.lock() {
            created.push(order.clone());
        }
        Ok(order)
    }

    fn verify_payment_signature(&self, order_id: &str, payment_id: &str, signature: &str) -> bool {
        signature::verify_checkout(&self.key_secret, order_id, payment_id, signature)
    }
}
