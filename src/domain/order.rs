use crate::domain::checkout::{CheckoutItem, CustomerDetails};
use crate::domain::ids;
use crate::domain::payment::OrderPaymentStatus;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Placed,
    Confirmed,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Placed => "placed",
            Self::Confirmed => "confirmed",
            Self::Processing => "processing",
            Self::Shipped => "shipped",
            Self::Delivered => "delivered",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "placed" => Some(Self::Placed),
            "confirmed" => Some(Self::Confirmed),
            "processing" => Some(Self::Processing),
            "shipped" => Some(Self::Shipped),
            "delivered" => Some(Self::Delivered),
            "cancelled" => Some(Self::Cancelled),
            _ => None,
        }
    }

    /// Legal forward moves. Cancellation is allowed until the parcel leaves.
    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        use OrderStatus::*;
        matches!(
            (*self, next),
            (Placed, Confirmed)
                | (Placed, Cancelled)
                | (Confirmed, Processing)
                | (Confirmed, Cancelled)
                | (Processing, Shipped)
                | (Processing, Cancelled)
                | (Shipped, Delivered)
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransitionError {
    #[error("order cannot move from {from} to {to}")]
    Illegal { from: &'static str, to: &'static str },
    #[error("tracking info can only be attached to a shipped order")]
    TrackingBeforeShipping,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OrderSummary {
    pub subtotal: f64,
    pub shipping: f64,
    pub total: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PaymentDetails {
    pub razorpay_order_id: String,
    #[serde(default)]
    pub razorpay_payment_id: Option<String>,
    pub payment_status: OrderPaymentStatus,
    #[serde(default)]
    pub payment_method: Option<String>,
    pub payment_amount: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OrderTimestamps {
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub paid_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub shipped_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub delivered_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub cancelled_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TrackingInfo {
    pub carrier: String,
    pub tracking_number: String,
    #[serde(default)]
    pub tracking_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: Uuid,
    pub order_id: String,
    pub customer_details: CustomerDetails,
    pub items: Vec<CheckoutItem>,
    pub order_summary: OrderSummary,
    pub payment_details: PaymentDetails,
    pub order_status: OrderStatus,
    pub timestamps: OrderTimestamps,
    #[serde(default)]
    pub tracking_info: Option<TrackingInfo>,
}

impl Order {
    pub fn place(
        customer_details: CustomerDetails,
        items: Vec<CheckoutItem>,
        order_summary: OrderSummary,
        razorpay_order_id: String,
        payment_amount: f64,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            order_id: ids::order_id(now),
            customer_details,
            items,
            order_summary,
            payment_details: PaymentDetails {
                razorpay_order_id,
                razorpay_payment_id: None,
                payment_status: OrderPaymentStatus::Pending,
                payment_method: None,
                payment_amount,
            },
            order_status: OrderStatus::Placed,
            timestamps: OrderTimestamps {
                created_at: now,
                updated_at: now,
                paid_at: None,
                shipped_at: None,
                delivered_at: None,
                cancelled_at: None,
            },
            tracking_info: None,
        }
    }

    /// Payment status follows the latest processed notification; `paid_at` is only ever set once.
    pub fn apply_payment(
        &mut self,
        status: OrderPaymentStatus,
        payment_id: Option<&str>,
        method: Option<&str>,
        now: DateTime<Utc>,
    ) {
        if self.payment_details.payment_status == OrderPaymentStatus::Paid
            && status != OrderPaymentStatus::Paid
        {
            tracing::warn!(
                order_id = %self.order_id,
                next = status.as_str(),
                "paid order receiving a later non-paid payment status"
            );
        }
        self.payment_details.payment_status = status;
        if let Some(id) = payment_id {
            self.payment_details.razorpay_payment_id = Some(id.to_string());
        }
        if let Some(m) = method {
            self.payment_details.payment_method = Some(m.to_string());
        }
        if status == OrderPaymentStatus::Paid && self.timestamps.paid_at.is_none() {
            self.timestamps.paid_at = Some(now);
        }
        self.timestamps.updated_at = now;
    }

    /// Returns `Ok(false)` when the order is already in `next`.
    pub fn transition(&mut self, next: OrderStatus, now: DateTime<Utc>) -> Result<bool, TransitionError> {
        if self.order_status == next {
            return Ok(false);
        }
        if !self.order_status.can_transition_to(next) {
            return Err(TransitionError::Illegal {
                from: self.order_status.as_str(),
                to: next.as_str(),
            });
        }
        self.order_status = next;
        let milestone = match next {
            OrderStatus::Shipped => Some(&mut self.timestamps.shipped_at),
            OrderStatus::Delivered => Some(&mut self.timestamps.delivered_at),
            OrderStatus::Cancelled => Some(&mut self.timestamps.cancelled_at),
            _ => None,
        };
        if let Some(slot) = milestone {
            slot.get_or_insert(now);
        }
        self.timestamps.updated_at = now;
        Ok(true)
    }

    pub fn attach_tracking(&mut self, tracking: TrackingInfo, now: DateTime<Utc>) -> Result<(), TransitionError> {
        if self.order_status != OrderStatus::Shipped {
            return Err(TransitionError::TrackingBeforeShipping);
        }
        self.tracking_info = Some(tracking);
        self.timestamps.updated_at = now;
        Ok(())
    }
}
