#[derive(Clone)]
pub struct AppConfig {
    pub bind_addr: String,
    pub database_url: Option<String>,
    pub redis_url: Option<String>,
    pub razorpay_base_url: String,
    pub razorpay_key_id: Option<String>,
    pub razorpay_key_secret: Option<String>,
    pub razorpay_webhook_secret: Option<String>,
    pub gateway_timeout_ms: u64,
    pub idempotency_ttl_secs: u64,
    pub admin_password: String,
    pub free_shipping_threshold: f64,
    pub flat_shipping_fee: f64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:3000".to_string(),
            database_url: None,
            redis_url: None,
            razorpay_base_url: "https://api.razorpay.com".to_string(),
            razorpay_key_id: None,
            razorpay_key_secret: None,
            razorpay_webhook_secret: None,
            gateway_timeout_ms: 2500,
            idempotency_ttl_secs: 86_400,
            admin_password: "dev-admin-password".to_string(),
            free_shipping_threshold: 799.0,
            flat_shipping_fee: 75.0,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self {
            bind_addr: std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string()),
            database_url: non_empty_var("DATABASE_URL"),
            redis_url: non_empty_var("REDIS_URL"),
            razorpay_base_url: std::env::var("RAZORPAY_BASE_URL")
                .unwrap_or_else(|_| "https://api.razorpay.com".to_string()),
            razorpay_key_id: non_empty_var("RAZORPAY_KEY_ID"),
            razorpay_key_secret: non_empty_var("RAZORPAY_KEY_SECRET"),
            razorpay_webhook_secret: non_empty_var("RAZORPAY_WEBHOOK_SECRET"),
            gateway_timeout_ms: parsed_var("GATEWAY_TIMEOUT_MS").unwrap_or(2500),
            idempotency_ttl_secs: parsed_var("IDEMPOTENCY_TTL_SECS").unwrap_or(86_400),
            admin_password: std::env::var("ADMIN_PASSWORD")
                .unwrap_or_else(|_| "dev-admin-password".to_string()),
            free_shipping_threshold: parsed_var("FREE_SHIPPING_THRESHOLD").unwrap_or(799.0),
            flat_shipping_fee: parsed_var("FLAT_SHIPPING_FEE").unwrap_or(75.0),
        }
    }

    pub fn shipping_policy(&self) -> crate::domain::cart::ShippingPolicy {
        crate::domain::cart::ShippingPolicy {
            free_above: self.free_shipping_threshold,
            flat_fee: self.flat_shipping_fee,
        }
    }
}

// Empty values count as unset so `.env` templates with blank keys fall back cleanly.
fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn parsed_var<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|s| s.parse::<T>().ok())
}
