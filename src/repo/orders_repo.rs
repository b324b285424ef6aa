use crate::domain::order::{Order, OrderStatus, TrackingInfo, TransitionError};
use crate::domain::payment::OrderPaymentStatus;
use crate::repo::{clamp_limit, OrderMutation, OrderStore};
use anyhow::Result;
use sqlx::types::Json;
use sqlx::{PgPool, Postgres, Row, Transaction};

#[derive(Clone)]
pub struct OrdersRepo {
    pub pool: PgPool,
}

fn decode(row: &sqlx::postgres::PgRow) -> Order {
    let doc: Json<Order> = row.get("document");
    doc.0
}

impl OrdersRepo {
    pub async fn insert_tx(tx: &mut Transaction<'_, Postgres>, order: &Order) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO orders (
                id, order_id, razorpay_order_id, customer_email, order_status, payment_status,
                document, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(order.id)
        .bind(&order.order_id)
        .bind(&order.payment_details.razorpay_order_id)
        .bind(order.customer_details.email.to_lowercase())
        .bind(order.order_status.as_str())
        .bind(order.payment_details.payment_status.as_str())
        .bind(Json(order))
        .bind(order.timestamps.created_at)
        .bind(order.timestamps.updated_at)
        .execute(tx.as_mut())
        .await?;

        Ok(())
    }

    pub async fn save_tx(tx: &mut Transaction<'_, Postgres>, order: &Order) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE orders
            SET order_status = $2, payment_status = $3, document = $4, updated_at = $5
            WHERE id = $1
            "#,
        )
        .bind(order.id)
        .bind(order.order_status.as_str())
        .bind(order.payment_details.payment_status.as_str())
        .bind(Json(order))
        .bind(order.timestamps.updated_at)
        .execute(tx.as_mut())
        .await?;

        Ok(())
    }

    pub async fn lock_by_order_id_tx(tx: &mut Transaction<'_, Postgres>, order_id: &str) -> Result<Option<Order>> {
        let row = sqlx::query("SELECT document FROM orders WHERE order_id = $1 FOR UPDATE")
            .bind(order_id)
            .fetch_optional(tx.as_mut())
            .await?;
        Ok(row.as_ref().map(decode))
    }

    pub async fn lock_by_gateway_id_tx(
        tx: &mut Transaction<'_, Postgres>,
        gateway_order_id: &str,
    ) -> Result<Option<Order>> {
        let row = sqlx::query(
            r#"
            SELECT document FROM orders
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

    async fn mutate<F>(&self, order_id: &str, f: F) -> Result<OrderMutation>
    where
        F: FnOnce(&mut Order) -> Result<(), TransitionError> + Send,
    {
        let mut tx = self.pool.begin().await?;
        let Some(mut order) = Self::lock_by_order_id_tx(&mut tx, order_id).await? else {
            tx.rollback().await?;
            return Ok(OrderMutation::NotFound);
        };
        if let Err(e) = f(&mut order) {
            tx.rollback().await?;
            return Ok(OrderMutation::Rejected(e));
        }
        Self::save_tx(&mut tx, &order).await?;
        tx.commit().await?;
        Ok(OrderMutation::Applied(order))
    }

    async fn list(&self, sql: &str, arg: Option<&str>, limit: i64) -> Result<Vec<Order>> {
        let mut query = sqlx::query(sql);
        if let Some(arg) = arg {
            query = query.bind(arg);
        }
        let rows = query.bind(clamp_limit(limit)).fetch_all(&self.pool).await?;
        Ok(rows.iter().map(decode).collect())
    }
}

#[async_trait::async_trait]
impl OrderStore for OrdersRepo {
    async fn create_order(&self, order: &Order) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        Self::insert_tx(&mut tx, order).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn get_order(&self, order_id: &str) -> Result<Option<Order>> {
        let row = sqlx::query("SELECT document FROM orders WHERE order_id = $1")
            .bind(order_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(decode))
    }

    async fn get_order_by_gateway_id(&self, gateway_order_id: &str) -> Result<Option<Order>> {
        let row = sqlx::query(
            "SELECT document FROM orders WHERE razorpay_order_id = $1 ORDER BY created_at DESC LIMIT 1",
        )
        .bind(gateway_order_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.as_ref().map(decode))
    }

    async fn update_order_status(
        &self,
        order_id: &str,
        status: OrderStatus,
        tracking: Option<TrackingInfo>,
    ) -> Result<OrderMutation> {
        let now = chrono::Utc::now();
        self.mutate(order_id, move |order| {
            order.transition(status, now)?;
            if let Some(tracking) = tracking {
                order.attach_tracking(tracking, now)?;
            }
            Ok(())
        })
        .await
    }

    async fn update_payment_status(
        &self,
        gateway_order_id: &str,
        status: OrderPaymentStatus,
        payment_id: Option<&str>,
        method: Option<&str>,
    ) -> Result<Option<Order>> {
        let mut tx = self.pool.begin().await?;
        let Some(mut order) = Self::lock_by_gateway_id_tx(&mut tx, gateway_order_id).await? else {
            tx.rollback().await?;
            return Ok(None);
        };
        order.apply_payment(status, payment_id, method, chrono::Utc::now());
        Self::save_tx(&mut tx, &order).await?;
        tx.commit().await?;
        Ok(Some(order))
    }

    async fn set_tracking(&self, order_id: &str, tracking: TrackingInfo) -> Result<OrderMutation> {
        let now = chrono::Utc::now();
        self.mutate(order_id, move |order| order.attach_tracking(tracking, now))
            .await
    }

    async fn list_orders_by_customer(&self, email: &str, limit: i64) -> Result<Vec<Order>> {
        self.list(
            "SELECT document FROM orders WHERE customer_email = $1 ORDER BY created_at DESC LIMIT $2",
            Some(&email.to_lowercase()),
            limit,
        )
        .await
    }

    async fn list_orders_by_status(&self, status: OrderStatus, limit: i64) -> Result<Vec<Order>> {
        self.list(
            "SELECT document FROM orders WHERE order_status = $1 ORDER BY created_at DESC LIMIT $2",
            Some(status.as_str()),
            limit,
        )
        .await
    }

    async fn list_recent_orders(&self, limit: i64) -> Result<Vec<Order>> {
        self.list(
            "SELECT document FROM orders ORDER BY created_at DESC LIMIT $1",
            None,
            limit,
        )
        .await
    }
}
