use crate::domain::order::Order;
use crate::domain::payment_log::PaymentLog;
use crate::domain::webhook_event::{PaymentUpdate, UpdateResult};
use crate::repo::orders_repo::OrdersRepo;
use crate::repo::payment_logs_repo::PaymentLogsRepo;
use crate::repo::Ledger;
use anyhow::Result;
use sqlx::PgPool;

/// Cross-collection writes, each committed as one Postgres transaction.
#[derive(Clone)]
pub struct LedgerRepo {
    pub pool: PgPool,
}

#[async_trait::async_trait]
impl Ledger for LedgerRepo {
    fn backend(&self) -> &'static str {
        "postgres"
    }

    async fn record_checkout(&self, order: &Order, log: &PaymentLog) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        OrdersRepo::insert_tx(&mut tx, order).await?;
        PaymentLogsRepo::insert_tx(&mut tx, log).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn apply_payment_update(&self, update: &PaymentUpdate) -> Result<UpdateResult> {
        let now = chrono::Utc::now();
        let mut tx = self.pool.begin().await?;
        let mut result = UpdateResult::default();

        if let Some(mut order) = OrdersRepo::lock_by_gateway_id_tx(&mut tx, &update.gateway_order_id).await? {
            update.apply_to_order(&mut order, now);
            OrdersRepo::save_tx(&mut tx, &order).await?;
            result.order_matched = true;
            result.order_id = Some(order.order_id.clone());
            result.payment_status = Some(order.payment_details.payment_status);
        }

        if update.log.is_some() {
            if let Some(mut log) =
                PaymentLogsRepo::lock_by_gateway_id_tx(&mut tx, &update.gateway_order_id).await?
            {
                if update.apply_to_log(&mut log, now) {
                    PaymentLogsRepo::save_tx(&mut tx, &log).await?;
                    result.payment_log_updated = true;
                    result.transaction_id = Some(log.transaction_id.clone());
                }
            }
        }

        tx.commit().await?;
        Ok(result)
    }

    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
