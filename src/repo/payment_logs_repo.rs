use crate::domain::payment::PaymentLogStatus;
use crate::domain::payment_log::PaymentLog;
use crate::repo::{clamp_limit, PaymentLogStore};
use anyhow::Result;
use chrono::Utc;
use sqlx::types::Json;
use sqlx::{PgPool, Postgres, Row, Transaction};

#[derive(Clone)]
pub struct PaymentLogsRepo {
    pub pool: PgPool,
}

fn decode(row: &sqlx::postgres::PgRow) -> PaymentLog {
    let doc: Json<PaymentLog> = row.get("document");
    doc.0
}

impl PaymentLogsRepo {
    pub async fn insert_tx(tx: &mut Transaction<'_, Postgres>, log: &PaymentLog) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO payments (
                id, transaction_id, order_id, razorpay_order_id, payment_status,
                document, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(log.id)
        .bind(&log.transaction_id)
        .bind(&log.order_reference.order_id)
        .bind(&log.razorpay_order_id)
        .bind(log.payment_status.as_str())
        .bind(Json(log))
        .bind(log.timestamps.created_at)
        .bind(log.timestamps.updated_at)
        .execute(tx.as_mut())
        .await?;

        Ok(())
    }

    pub async fn save_tx(tx: &mut Transaction<'_, Postgres>, log: &PaymentLog) -> Result<()> {
        sqlx::query(
            "UPDATE payments SET payment_status = $2, document = $3, updated_at = $4 WHERE id = $1",
        )
        .bind(log.id)
        .bind(log.payment_status.as_str())
        .bind(Json(log))
        .bind(log.timestamps.updated_at)
        .execute(tx.as_mut())
        .await?;

        Ok(())
    }

    pub async fn lock_by_gateway_id_tx(
        tx: &mut Transaction<'_, Postgres>,
        gateway_order_id: &str,
    ) -> Result<Option<PaymentLog>> {
        let row = sqlx::query(
            r#"
            SELECT document FROM payments
            WHERE razorpay_order_id = $1
            ORDER BY created_at DESC
            LIMIT 1
            FOR UPDATE
            "#,
        )
        .bind(gateway_order_id)
        .fetch_optional(tx.as_mut())
        .await?;
        Ok(row.as_ref().map(decode))
    }

    async fn lock_by_transaction_id_tx(
        tx: &mut Transaction<'_, Postgres>,
        transaction_id: &str,
    ) -> Result<Option<PaymentLog>> {
        let row = sqlx::query("SELECT document FROM payments WHERE transaction_id = $1 FOR UPDATE")
            .bind(transaction_id)
            .fetch_optional(tx.as_mut())
            .await?;
        Ok(row.as_ref().map(decode))
    }

    async fn mutate_by_transaction_id<F>(&self, transaction_id: &str, f: F) -> Result<Option<PaymentLog>>
    where
        F: FnOnce(&mut PaymentLog) + Send,
    {
        let mut tx = self.pool.begin().await?;
        let Some(mut log) = Self::lock_by_transaction_id_tx(&mut tx, transaction_id).await? else {
            tx.rollback().await?;
            return Ok(None);
        };
        f(&mut log);
        Self::save_tx(&mut tx, &log).await?;
        tx.commit().await?;
        Ok(Some(log))
    }
}

#[async_trait::async_trait]
impl PaymentLogStore for PaymentLogsRepo {
    async fn create_log(&self, log: &PaymentLog) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        Self::insert_tx(&mut tx, log).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn get_log(&self, transaction_id: &str) -> Result<Option<PaymentLog>> {
        let row = sqlx::query("SELECT document FROM payments WHERE transaction_id = $1")
            .bind(transaction_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(decode))
    }

    async fn get_log_by_gateway_id(&self, gateway_order_id: &str) -> Result<Option<PaymentLog>> {
        let row = sqlx::query(
            "SELECT document FROM payments WHERE razorpay_order_id = $1 ORDER BY created_at DESC LIMIT 1",
        )
        .bind(gateway_order_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.as_ref().map(decode))
    }

    async fn update_log_status(
        &self,
        transaction_id: &str,
        status: PaymentLogStatus,
    ) -> Result<Option<PaymentLog>> {
        self.mutate_by_transaction_id(transaction_id, move |log| log.set_status(status, Utc::now()))
            .await
    }

    async fn record_failure(
        &self,
        transaction_id: &str,
        error_code: Option<String>,
        error_description: Option<String>,
        failure_reason: &str,
    ) -> Result<Option<PaymentLog>> {
        self.mutate_by_transaction_id(transaction_id, |log| {
            log.record_failure(error_code, error_description, failure_reason, Utc::now());
        })
        .await
    }

    async fn track_retry(&self, transaction_id: &str) -> Result<Option<PaymentLog>> {
        self.mutate_by_transaction_id(transaction_id, |log| {
            log.track_retry(Utc::now());
        })
        .await
    }

    async fn record_client_confirmation(
        &self,
        gateway_order_id: &str,
        payment_id: &str,
        signature: &str,
    ) -> Result<Option<PaymentLog>> {
        let mut tx = self.pool.begin().await?;
        let Some(mut log) = Self::lock_by_gateway_id_tx(&mut tx, gateway_order_id).await? else {
            tx.rollback().await?;
            return Ok(None);
        };
        log.record_client_confirmation(payment_id, signature, Utc::now());
        Self::save_tx(&mut tx, &log).await?;
        tx.commit().await?;
        Ok(Some(log))
    }

    async fn list_logs_by_order(&self, order_id: &str) -> Result<Vec<PaymentLog>> {
        let rows = sqlx::query("SELECT document FROM payments WHERE order_id = $1 ORDER BY created_at ASC")
            .bind(order_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.iter().map(decode).collect())
    }

    async fn list_logs_by_status(&self, status: PaymentLogStatus, limit: i64) -> Result<Vec<PaymentLog>> {
        let rows = sqlx::query(
            "SELECT document FROM payments WHERE payment_status = $1 ORDER BY created_at DESC LIMIT $2",
        )
        .bind(status.as_str())
        .bind(clamp_limit(limit))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.iter().map(decode).collect())
    }

    async fn list_recent_logs(&self, limit: i64) -> Result<Vec<PaymentLog>> {
        let rows = sqlx::query("SELECT document FROM payments ORDER BY created_at DESC LIMIT $1")
            .bind(clamp_limit(limit))
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.iter().map(decode).collect())
    }
}
