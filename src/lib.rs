pub mod config;
pub mod domain {
    pub mod cart;
    pub mod catalog;
    pub mod checkout;
    pub mod ids;
    pub mod order;
    pub mod payment;
    pub mod payment_log;
    pub mod webhook_event;
}
pub mod gateways;
pub mod http {
    pub mod handlers {
        pub mod admin;
        pub mod catalog;
        pub mod checkout;
        pub mod ops;
        pub mod webhooks;
    }
    pub mod middleware {
        pub mod admin_auth;
    }
    pub mod routes;
}
pub mod idempotency;
pub mod repo;
pub mod service {
    pub mod cart_store;
    pub mod checkout_service;
    pub mod webhook_service;
}

use config::AppConfig;
use gateways::PaymentGateway;
use idempotency::memory::MemoryIdempotencyStore;
use idempotency::IdempotencyStore;
use repo::memory::MemoryStore;
use repo::{CatalogStore, Ledger, OrderStore, PaymentLogStore};
use service::checkout_service::CheckoutService;
use service::webhook_service::WebhookService;
use std::sync::Arc;

/// Storage and gateway handles chosen at startup.
#[derive(Clone)]
pub struct Backends {
    pub orders: Arc<dyn OrderStore>,
    pub payment_logs: Arc<dyn PaymentLogStore>,
    pub ledger: Arc<dyn Ledger>,
    pub catalog: Arc<dyn CatalogStore>,
    pub idempotency: Arc<dyn IdempotencyStore>,
    pub gateway: Arc<dyn PaymentGateway>,
}

impl Backends {
    pub fn memory(store: Arc<MemoryStore>, gateway: Arc<dyn PaymentGateway>) -> Self {
        Self {
            orders: store.clone(),
            payment_logs: store.clone(),
            ledger: store.clone(),
            catalog: store,
            idempotency: Arc::new(MemoryIdempotencyStore::default()),
            gateway,
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub orders: Arc<dyn OrderStore>,
    pub payment_logs: Arc<dyn PaymentLogStore>,
    pub ledger: Arc<dyn Ledger>,
    pub catalog: Arc<dyn CatalogStore>,
    pub idempotency: Arc<dyn IdempotencyStore>,
    pub checkout_service: CheckoutService,
    pub webhook_service: WebhookService,
    pub admin_password: String,
    pub started_at: std::time::Instant,
    pub started_wall_clock: chrono::DateTime<chrono::Utc>,
}

impl AppState {
    pub fn new(cfg: &AppConfig, backends: Backends) -> Self {
        let checkout_service = CheckoutService {
            gateway: backends.gateway,
            ledger: backends.ledger.clone(),
            payment_logs: backends.payment_logs.clone(),
            shipping: cfg.shipping_policy(),
        };
        let webhook_service = WebhookService {
            secret: cfg.razorpay_webhook_secret.clone(),
            ledger: backends.ledger.clone(),
            idempotency: backends.idempotency.clone(),
        };
        Self {
            orders: backends.orders,
            payment_logs: backends.payment_logs,
            ledger: backends.ledger,
            catalog: backends.catalog,
            idempotency: backends.idempotency,
            checkout_service,
            webhook_service,
            admin_password: cfg.admin_password.clone(),
            started_at: std::time::Instant::now(),
            started_wall_clock: chrono::Utc::now(),
        }
    }
}
