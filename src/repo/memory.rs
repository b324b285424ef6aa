use crate::domain::catalog::{Banner, Collection, Product, ProductFilter};
use crate::domain::order::{Order, OrderStatus, TrackingInfo, TransitionError};
use crate::domain::payment::{OrderPaymentStatus, PaymentLogStatus};
use crate::domain::payment_log::PaymentLog;
use crate::domain::webhook_event::{PaymentUpdate, UpdateResult};
use crate::repo::{clamp_limit, CatalogStore, Ledger, OrderMutation, OrderStore, PaymentLogStore};
use anyhow::{bail, Result};
use chrono::Utc;
use std::collections::{BTreeMap, HashMap};
use tokio::sync::RwLock;

#[derive(Default)]
struct Collections {
    orders: HashMap<String, Order>,
    order_by_gateway: HashMap<String, String>,
    logs: HashMap<String, PaymentLog>,
    log_by_gateway: HashMap<String, String>,
    products: BTreeMap<String, Product>,
    banners: Vec<Banner>,
    collections: Vec<Collection>,
}

impl Collections {
    fn order_for_gateway_mut(&mut self, gateway_order_id: &str) -> Option<&mut Order> {
        let order_id = self.order_by_gateway.get(gateway_order_id)?;
        self.orders.get_mut(order_id)
    }

    fn log_for_gateway_mut(&mut self, gateway_order_id: &str) -> Option<&mut PaymentLog> {
        let txn = self.log_by_gateway.get(gateway_order_id)?;
        self.logs.get_mut(txn)
    }
}

/// Process-local store used without `DATABASE_URL` and in tests.
/// One lock guards every collection, so ledger writes are atomic here as well.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Collections>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn seed_catalog(&self, products: Vec<Product>, banners: Vec<Banner>, collections: Vec<Collection>) {
        let mut inner = self.inner.write().await;
        for p in products {
            inner.products.insert(p.id.clone(), p);
        }
        inner.banners.extend(banners);
        inner.collections.extend(collections);
    }
}

fn newest_first<T, F>(mut items: Vec<T>, created: F, limit: i64) -> Vec<T>
where
    F: Fn(&T) -> chrono::DateTime<Utc>,
{
    items.sort_by_key(|b| std::cmp::Reverse(created(b)));
    items.truncate(clamp_limit(limit) as usize);
    items
}

fn mutate_order<F>(inner: &mut Collections, order_id: &str, f: F) -> OrderMutation
where
    F: FnOnce(&mut Order) -> Result<(), TransitionError>,
{
    let Some(current) = inner.orders.get(order_id) else {
        return OrderMutation::NotFound;
    };
    // work on a copy so a rejected change leaves the stored document untouched
    let mut next = current.clone();
    match f(&mut next) {
        Ok(()) => {
            inner.orders.insert(order_id.to_string(), next.clone());
            OrderMutation::Applied(next)
        }
        Err(e) => OrderMutation::Rejected(e),
    }
}

#[async_trait::async_trait]
impl OrderStore for MemoryStore {
    async fn create_order(&self, order: &Order) -> Result<()> {
        let mut inner = self.inner.write().await;
        if inner.orders.contains_key(&order.order_id) {
            bail!("duplicate order id {}", order.order_id);
        }
        inner.order_by_gateway.insert(
            order.payment_details.razorpay_order_id.clone(),
            order.order_id.clone(),
        );
        inner.orders.insert(order.order_id.clone(), order.clone());
        Ok(())
    }

    async fn get_order(&self, order_id: &str) -> Result<Option<Order>> {
        Ok(self.inner.read().await.orders.get(order_id).cloned())
    }

    async fn get_order_by_gateway_id(&self, gateway_order_id: &str) -> Result<Option<Order>> {
        let inner = self.inner.read().await;
        Ok(inner
            .order_by_gateway
            .get(gateway_order_id)
            .and_then(|id| inner.orders.get(id))
            .cloned())
    }

    async fn update_order_status(
        &self,
        order_id: &str,
        status: OrderStatus,
        tracking: Option<TrackingInfo>,
    ) -> Result<OrderMutation> {
        let now = Utc::now();
        let mut inner = self.inner.write().await;
        Ok(mutate_order(&mut inner, order_id, |order| {
            order.transition(status, now)?;
            if let Some(tracking) = tracking {
                order.attach_tracking(tracking, now)?;
            }
            Ok(())
        }))
    }

    async fn update_payment_status(
        &self,
        gateway_order_id: &str,
        status: OrderPaymentStatus,
        payment_id: Option<&str>,
        method: Option<&str>,
    ) -> Result<Option<Order>> {
        let mut inner = self.inner.write().await;
        Ok(inner.order_for_gateway_mut(gateway_order_id).map(|order| {
            order.apply_payment(status, payment_id, method, Utc::now());
            order.clone()
        }))
    }

    async fn set_tracking(&self, order_id: &str, tracking: TrackingInfo) -> Result<OrderMutation> {
        let now = Utc::now();
        let mut inner = self.inner.write().await;
        Ok(mutate_order(&mut inner, order_id, |order| order.attach_tracking(tracking, now)))
    }

    async fn list_orders_by_customer(&self, email: &str, limit: i64) -> Result<Vec<Order>> {
        let inner = self.inner.read().await;
        let matched: Vec<Order> = inner
            .orders
            .values()
            .filter(|o| o.customer_details.email.eq_ignore_ascii_case(email))
            .cloned()
            .collect();
        Ok(newest_first(matched, |o| o.timestamps.created_at, limit))
    }

    async fn list_orders_by_status(&self, status: OrderStatus, limit: i64) -> Result<Vec<Order>> {
        let inner = self.inner.read().await;
        let matched: Vec<Order> = inner
            .orders
            .values()
            .filter(|o| o.order_status == status)
            .cloned()
            .collect();
        Ok(newest_first(matched, |o| o.timestamps.created_at, limit))
    }

    async fn list_recent_orders(&self, limit: i64) -> Result<Vec<Order>> {
        let inner = self.inner.read().await;
        let all: Vec<Order> = inner.orders.values().cloned().collect();
        Ok(newest_first(all, |o| o.timestamps.created_at, limit))
    }
}

#[async_trait::async_trait]
impl PaymentLogStore for MemoryStore {
    async fn create_log(&self, log: &PaymentLog) -> Result<()> {
        let mut inner = self.inner.write().await;
        if inner.logs.contains_key(&log.transaction_id) {
            bail!("duplicate transaction id {}", log.transaction_id);
        }
        inner
            .log_by_gateway
            .insert(log.razorpay_order_id.clone(), log.transaction_id.clone());
        inner.logs.insert(log.transaction_id.clone(), log.clone());
        Ok(())
    }

    async fn get_log(&self, transaction_id: &str) -> Result<Option<PaymentLog>> {
        Ok(self.inner.read().await.logs.get(transaction_id).cloned())
    }

    async fn get_log_by_gateway_id(&self, gateway_order_id: &str) -> Result<Option<PaymentLog>> {
        let inner = self.inner.read().await;
        Ok(inner
            .log_by_gateway
            .get(gateway_order_id)
            .and_then(|txn| inner.logs.get(txn))
            .cloned())
    }

    async fn update_log_status(
        &self,
        transaction_id: &str,
        status: PaymentLogStatus,
    ) -> Result<Option<PaymentLog>> {
        let mut inner = self.inner.write().await;
        Ok(inner.logs.get_mut(transaction_id).map(|log| {
            log.set_status(status, Utc::now());
            log.clone()
        }))
    }

    async fn record_failure(
        &self,
        transaction_id: &str,
        error_code: Option<String>,
        error_description: Option<String>,
        failure_reason: &str,
    ) -> Result<Option<PaymentLog>> {
        let mut inner = self.inner.write().await;
        Ok(inner.logs.get_mut(transaction_id).map(|log| {
            log.record_failure(error_code, error_description, failure_reason, Utc::now());
            log.clone()
        }))
    }

    async fn track_retry(&self, transaction_id: &str) -> Result<Option<PaymentLog>> {
        let mut inner = self.inner.write().await;
        Ok(inner.logs.get_mut(transaction_id).map(|log| {
            log.track_retry(Utc::now());
            log.clone()
        }))
    }

    async fn record_client_confirmation(
        &self,
        gateway_order_id: &str,
        payment_id: &str,
        signature: &str,
    ) -> Result<Option<PaymentLog>> {
        let mut inner = self.inner.write().await;
        Ok(inner.log_for_gateway_mut(gateway_order_id).map(|log| {
            log.record_client_confirmation(payment_id, signature, Utc::now());
            log.clone()
        }))
    }

    async fn list_logs_by_order(&self, order_id: &str) -> Result<Vec<PaymentLog>> {
        let inner = self.inner.read().await;
        let mut logs: Vec<PaymentLog> = inner
            .logs
            .values()
            .filter(|l| l.order_reference.order_id == order_id)
            .cloned()
            .collect();
        logs.sort_by_key(|l| l.timestamps.created_at);
        Ok(logs)
    }

    async fn list_logs_by_status(&self, status: PaymentLogStatus, limit: i64) -> Result<Vec<PaymentLog>> {
        let inner = self.inner.read().await;
        let matched: Vec<PaymentLog> = inner
            .logs
            .values()
            .filter(|l| l.payment_status == status)
            .cloned()
            .collect();
        Ok(newest_first(matched, |l| l.timestamps.created_at, limit))
    }

    async fn list_recent_logs(&self, limit: i64) -> Result<Vec<PaymentLog>> {
        let inner = self.inner.read().await;
        let all: Vec<PaymentLog> = inner.logs.values().cloned().collect();
        Ok(newest_first(all, |l| l.timestamps.created_at, limit))
    }
}

#[async_trait::async_trait]
impl Ledger for MemoryStore {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn record_checkout(&self, order: &Order, log: &PaymentLog) -> Result<()> {
        let mut inner = self.inner.write().await;
        if inner.orders.contains_key(&order.order_id) || inner.logs.contains_key(&log.transaction_id) {
            bail!("order {} already recorded", order.order_id);
        }
        let gateway_id = order.payment_details.razorpay_order_id.clone();
        inner.order_by_gateway.insert(gateway_id.clone(), order.order_id.clone());
        inner.orders.insert(order.order_id.clone(), order.clone());
        inner.log_by_gateway.insert(gateway_id, log.transaction_id.clone());
        inner.logs.insert(log.transaction_id.clone(), log.clone());
        Ok(())
    }

    async fn apply_payment_update(&self, update: &PaymentUpdate) -> Result<UpdateResult> {
        let now = Utc::now();
        let mut inner = self.inner.write().await;
        let mut result = UpdateResult::default();

        if let Some(order) = inner.order_for_gateway_mut(&update.gateway_order_id) {
            update.apply_to_order(order, now);
            result.order_matched = true;
            result.order_id = Some(order.order_id.clone());
            result.payment_status = Some(order.payment_details.payment_status);
        }
        if let Some(log) = inner.log_for_gateway_mut(&update.gateway_order_id) {
            if update.apply_to_log(log, now) {
                result.payment_log_updated = true;
                result.transaction_id = Some(log.transaction_id.clone());
            }
        }
        Ok(result)
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}

#[async_trait::async_trait]
impl CatalogStore for MemoryStore {
    async fn list_products(&self, filter: &ProductFilter) -> Result<Vec<Product>> {
        let inner = self.inner.read().await;
        let mut matched: Vec<Product> = inner
            .products
            .values()
            .filter(|p| filter.matches(p))
            .cloned()
            .collect();
        matched.sort_by_key(|p| std::cmp::Reverse(p.created_at));
        Ok(matched)
    }

    async fn get_product(&self, id: &str) -> Result<Option<Product>> {
        Ok(self.inner.read().await.products.get(id).cloned())
    }

    async fn upsert_product(&self, product: &Product) -> Result<()> {
        self.inner
            .write()
            .await
            .products
            .insert(product.id.clone(), product.clone());
        Ok(())
    }

    async fn delete_product(&self, id: &str) -> Result<bool> {
        Ok(self.inner.write().await.products.remove(id).is_some())
    }

    async fn list_banners(&self) -> Result<Vec<Banner>> {
        let inner = self.inner.read().await;
        let mut banners: Vec<Banner> = inner.banners.iter().filter(|b| b.active).cloned().collect();
        banners.sort_by_key(|b| b.position);
        Ok(banners)
    }

    async fn list_collections(&self) -> Result<Vec<Collection>> {
        let inner = self.inner.read().await;
        let mut collections = inner.collections.clone();
        collections.sort_by(|a, b| a.slug.cmp(&b.slug));
        Ok(collections)
    }
}
