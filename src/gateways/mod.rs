use anyhow::Result;
use serde::{Deserialize, Serialize};

pub mod mock;
pub mod razorpay;
pub mod signature;

pub const CURRENCY_INR: &str = "INR";

#[derive(Debug, Clone)]
pub struct GatewayOrderRequest {
    pub amount_minor: i64,
    pub currency: String,
    pub receipt: String,
    pub notes: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GatewayOrder {
    pub id: String,
    pub amount: i64,
    pub currency: String,
    pub receipt: String,
    #[serde(default)]
    pub status: Option<String>,
}

/// Major currency units to the gateway's minor unit (paise).
pub fn to_minor_units(amount: f64) -> i64 {
    (amount * 100.0).round() as i64
}

#[async_trait::async_trait]
pub trait PaymentGateway: Send + Sync {
    fn name(&self) -> &'static str;

    async fn create_order(&self, request: GatewayOrderRequest) -> Result<GatewayOrder>;

    /// Checks the signature the hosted checkout hands back to the browser.
    fn verify_payment_signature(&self, order_id: &str, payment_id: &str, signature: &str) -> bool;
}
