use crate::domain::catalog::{Banner, Collection, Product, ProductFilter};
use crate::domain::order::{Order, OrderStatus, TrackingInfo, TransitionError};
use crate::domain::payment::{OrderPaymentStatus, PaymentLogStatus};
use crate::domain::payment_log::PaymentLog;
use crate::domain::webhook_event::{PaymentUpdate, UpdateResult};
use anyhow::Result;

pub mod catalog_repo;
pub mod ledger_repo;
pub mod memory;
pub mod orders_repo;
pub mod payment_logs_repo;

#[derive(Debug, Clone, PartialEq)]
pub enum OrderMutation {
    Applied(Order),
    Rejected(TransitionError),
    NotFound,
}

#[async_trait::async_trait]
pub trait OrderStore: Send + Sync {
    async fn create_order(&self, order: &Order) -> Result<()>;

    async fn get_order(&self, order_id: &str) -> Result<Option<Order>>;

    /// Reverse lookup for webhook handling, which only knows the gateway order id.
    async fn get_order_by_gateway_id(&self, gateway_order_id: &str) -> Result<Option<Order>>;

    async fn update_order_status(
        &self,
        order_id: &str,
        status: OrderStatus,
        tracking: Option<TrackingInfo>,
    ) -> Result<OrderMutation>;

    async fn update_payment_status(
        &self,
        gateway_order_id: &str,
        status: OrderPaymentStatus,
        payment_id: Option<&str>,
        method: Option<&str>,
    ) -> Result<Option<Order>>;

    async fn set_tracking(&self, order_id: &str, tracking: TrackingInfo) -> Result<OrderMutation>;

    async fn list_orders_by_customer(&self, email: &str, limit: i64) -> Result<Vec<Order>>;

    async fn list_orders_by_status(&self, status: OrderStatus, limit: i64) -> Result<Vec<Order>>;

    async fn list_recent_orders(&self, limit: i64) -> Result<Vec<Order>>;
}

#[async_trait::async_trait]
pub trait PaymentLogStore: Send + Sync {
    async fn create_log(&self, log: &PaymentLog) -> Result<()>;

    async fn get_log(&self, transaction_id: &str) -> Result<Option<PaymentLog>>;

    async fn get_log_by_gateway_id(&self, gateway_order_id: &str) -> Result<Option<PaymentLog>>;

    async fn update_log_status(
        &self,
        transaction_id: &str,
        status: PaymentLogStatus,
    ) -> Result<Option<PaymentLog>>;

    async fn record_failure(
        &self,
        transaction_id: &str,
        error_code: Option<String>,
        error_description: Option<String>,
        failure_reason: &str,
    ) -> Result<Option<PaymentLog>>;

    async fn track_retry(&self, transaction_id: &str) -> Result<Option<PaymentLog>>;

    async fn record_client_confirmation(
        &self,
        gateway_order_id: &str,
        payment_id: &str,
        signature: &str,
    ) -> Result<Option<PaymentLog>>;

    async fn list_logs_by_order(&self, order_id: &str) -> Result<Vec<PaymentLog>>;

    async fn list_logs_by_status(&self, status: PaymentLogStatus, limit: i64) -> Result<Vec<PaymentLog>>;

    async fn list_recent_logs(&self, limit: i64) -> Result<Vec<PaymentLog>>;
}

/// Writes that must land on the order and its payment log together.
#[async_trait::async_trait]
pub trait Ledger: Send + Sync {
    fn backend(&self) -> &'static str;

    async fn record_checkout(&self, order: &Order, log: &PaymentLog) -> Result<()>;

    async fn apply_payment_update(&self, update: &PaymentUpdate) -> Result<UpdateResult>;

    async fn ping(&self) -> Result<()>;
}

#[async_trait::async_trait]
pub trait CatalogStore: Send + Sync {
    async fn list_products(&self, filter: &ProductFilter) -> Result<Vec<Product>>;

    async fn get_product(&self, id: &str) -> Result<Option<Product>>;

    async fn upsert_product(&self, product: &Product) -> Result<()>;

    async fn delete_product(&self, id: &str) -> Result<bool>;

    async fn list_banners(&self) -> Result<Vec<Banner>>;

    async fn list_collections(&self) -> Result<Vec<Collection>>;
}

pub(crate) fn clamp_limit(limit: i64) -> i64 {
    limit.clamp(1, 500)
}
