use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CustomerDetails {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    pub pincode: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alternate_phone: Option<String>,
}

/// One cart line as submitted at checkout; becomes the immutable order item snapshot.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutItem {
    pub product_id: String,
    pub title: String,
    pub price: f64,
    pub quantity: u32,
    pub size: String,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    pub amount: Option<f64>,
    pub customer_details: Option<CustomerDetails>,
    pub cart_items: Option<Vec<CheckoutItem>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct GatewayOrderView {
    pub id: String,
    pub amount: i64,
    pub currency: String,
    pub receipt: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderResponse {
    pub success: bool,
    pub order: GatewayOrderView,
    pub order_id: String,
    pub customer_details: CustomerDetails,
    pub cart_items: Vec<CheckoutItem>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VerifyPaymentRequest {
    pub razorpay_payment_id: Option<String>,
    pub razorpay_order_id: Option<String>,
    pub razorpay_signature: Option<String>,
    #[serde(rename = "orderId")]
    pub order_id: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyPaymentResponse {
    pub success: bool,
    pub message: String,
    pub payment_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: &'static str,
    pub message: &'static str,
}

#[derive(Debug, thiserror::Error)]
#[error("invalid customer details ({} field(s))", .0.len())]
pub struct CheckoutError(pub Vec<FieldError>);

fn is_digits(s: &str, len: usize) -> bool {
    s.len() == len && s.chars().all(|c| c.is_ascii_digit())
}

fn looks_like_email(s: &str) -> bool {
    match s.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !s.contains(char::is_whitespace)
        }
        None => false,
    }
}

pub fn validate_customer(details: &CustomerDetails) -> Result<(), CheckoutError> {
    let mut errors = Vec::new();
    if details.name.trim().is_empty() {
        errors.push(FieldError { field: "name", message: "name is required" });
    }
    if !looks_like_email(details.email.trim()) {
        errors.push(FieldError { field: "email", message: "a valid email is required" });
    }
    if !is_digits(details.phone.trim(), 10) {
        errors.push(FieldError { field: "phone", message: "phone must be 10 digits" });
    }
    if details.address.trim().is_empty() {
        errors.push(FieldError { field: "address", message: "address is required" });
    }
    if !is_digits(details.pincode.trim(), 6) {
        errors.push(FieldError { field: "pincode", message: "pincode must be 6 digits" });
    }
    if let Some(alt) = details.alternate_phone.as_deref().map(str::trim) {
        if !alt.is_empty() && !is_digits(alt, 10) {
            errors.push(FieldError {
                field: "alternatePhone",
                message: "alternate phone must be 10 digits",
            });
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(CheckoutError(errors))
    }
}
